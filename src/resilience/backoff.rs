//! Exponential backoff, optionally jittered.

use rand::Rng;
use std::time::Duration;

/// Delay to wait after failed attempt `attempt` (1-indexed):
/// `min(initial × multiplier^(attempt-1), max)`.
pub fn compute_backoff(
    attempt: u32,
    initial: Duration,
    multiplier: f64,
    max: Duration,
) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    let factor = multiplier.max(1.0).powi(exponent);
    let delay_ms = initial.as_millis() as f64 * factor;
    let max_ms = max.as_millis() as f64;

    // f64 → u64 casts saturate, and `min` keeps infinities out.
    Duration::from_millis(delay_ms.min(max_ms) as u64)
}

/// Add up to `ratio × delay` of random jitter. A ratio of 0 leaves the delay untouched.
pub fn apply_jitter(delay: Duration, ratio: f64) -> Duration {
    if ratio <= 0.0 {
        return delay;
    }

    let jitter_range = (delay.as_millis() as f64 * ratio.min(1.0)) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    delay + Duration::from_millis(jitter)
}

//! Retry, timeout and fallback behavior on a paused clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use before_after::errors::{codes, presets, AppError};
use before_after::resilience::{candidate, FallbackOperation};
use before_after::{run_with_fallback, run_with_retry, RetryConfig, RetryResult};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn policy(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        ..RetryConfig::default()
    }
}

/// Timer ticks are whole milliseconds, so allow a little slack on a paused clock.
fn assert_gaps(actual: &[u128], expected: &[u128]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?}");
    for (got, want) in actual.iter().zip(expected) {
        assert!(*got >= *want && *got < *want + 5, "gaps {actual:?}, expected {expected:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_retryable_failure_uses_every_attempt() {
    let calls = AtomicU32::new(0);

    let result = run_with_retry(
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(presets::network_error("connection reset")) }
        },
        &policy(4),
        None,
    )
    .await;

    assert_eq!(result.attempts(), 4);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(result.error().unwrap().code(), codes::NETWORK_ERROR);
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_on_second_attempt() {
    let calls = AtomicU32::new(0);

    let result = run_with_retry(
        || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 2 {
                    Err(presets::timeout())
                } else {
                    Ok("image")
                }
            }
        },
        &policy(3),
        None,
    )
    .await;

    assert_eq!(
        result,
        RetryResult::Success {
            data: "image",
            attempts: 2
        }
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_failure_stops_immediately() {
    let calls = AtomicU32::new(0);

    let result = run_with_retry(
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(presets::validation("width must be positive")) }
        },
        &policy(5),
        None,
    )
    .await;

    assert_eq!(result.attempts(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.error().unwrap().code(), codes::VALIDATION_ERROR);
}

#[tokio::test(start_paused = true)]
async fn test_custom_predicate_overrides_retryable_flag() {
    let calls = AtomicU32::new(0);
    let config = policy(3).with_should_retry(|_: &AppError| false);

    let result = run_with_retry(
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(presets::upstream_error(503)) }
        },
        &config,
        None,
    )
    .await;

    assert_eq!(result.attempts(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_between_attempts() {
    let started = Instant::now();
    let stamps = Mutex::new(Vec::new());

    let result = run_with_retry(
        || {
            stamps.lock().unwrap().push(started.elapsed());
            async { Err::<(), _>(presets::network_error("down")) }
        },
        &policy(4),
        None,
    )
    .await;

    assert_eq!(result.attempts(), 4);
    let stamps = stamps.into_inner().unwrap();
    let gaps: Vec<u128> = stamps.windows(2).map(|w| (w[1] - w[0]).as_millis()).collect();
    assert_gaps(&gaps, &[1000, 2000, 4000]);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_is_capped() {
    let stamps = Mutex::new(Vec::new());
    let started = Instant::now();
    let config = RetryConfig {
        max_attempts: 4,
        initial_delay: Duration::from_millis(3000),
        max_delay: Duration::from_millis(5000),
        ..RetryConfig::default()
    };

    run_with_retry(
        || {
            stamps.lock().unwrap().push(started.elapsed());
            async { Err::<(), _>(presets::network_error("down")) }
        },
        &config,
        None,
    )
    .await;

    let stamps = stamps.into_inner().unwrap();
    let gaps: Vec<u128> = stamps.windows(2).map(|w| (w[1] - w[0]).as_millis()).collect();
    assert_gaps(&gaps, &[3000, 5000, 5000]);
}

#[tokio::test(start_paused = true)]
async fn test_never_settling_operation_times_out_per_attempt() {
    let calls = AtomicU32::new(0);
    let started = Instant::now();
    let config = RetryConfig {
        max_attempts: 2,
        timeout: Duration::from_millis(500),
        ..RetryConfig::default()
    };

    let result = run_with_retry(
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<Result<(), AppError>>()
        },
        &config,
        None,
    )
    .await;

    let error = result.error().unwrap();
    assert_eq!(error.code(), codes::TIMEOUT);
    assert!(error.is_retryable());
    assert_eq!(result.attempts(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    // 500ms attempt, 1000ms backoff, 500ms attempt
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(2000) && elapsed < Duration::from_millis(2010));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start_never_invokes() {
    let calls = AtomicU32::new(0);
    let token = CancellationToken::new();
    token.cancel();

    let result = run_with_retry(
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, AppError>(()) }
        },
        &policy(3),
        Some(&token),
    )
    .await;

    assert_eq!(result.error().unwrap().code(), codes::CANCELLED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_backoff_stops_retrying() {
    let calls = AtomicU32::new(0);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let result = run_with_retry(
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(presets::network_error("down")) }
        },
        &policy(5),
        Some(&token),
    )
    .await;

    assert_eq!(result.error().unwrap().code(), codes::CANCELLED);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_drops_in_flight_attempt() {
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let result = run_with_retry(
        || std::future::pending::<Result<(), AppError>>(),
        &policy(3),
        Some(&token),
    )
    .await;

    // The dropped attempt surfaces as a timeout; the next checkpoint sees
    // the token and stops.
    assert!(!result.is_success());
    assert_eq!(result.error().unwrap().code(), codes::CANCELLED);
    assert_eq!(result.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_sums_attempts() {
    let config = policy(3);
    let operations: Vec<FallbackOperation<'_, &str>> = vec![
        candidate(|| async { Err::<&str, _>(presets::network_error("primary down")) }),
        candidate(|| async { Ok::<_, AppError>("secondary") }),
    ];

    let result = run_with_fallback(operations, &config, None).await;

    assert_eq!(
        result,
        RetryResult::Success {
            data: "secondary",
            attempts: 4
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_fallback_skips_later_candidates_after_success() {
    let later_calls = AtomicU32::new(0);
    let operations: Vec<FallbackOperation<'_, u8>> = vec![
        candidate(|| async { Ok::<_, AppError>(1) }),
        candidate(|| {
            later_calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, AppError>(2) }
        }),
    ];

    let result = run_with_fallback(operations, &policy(3), None).await;

    assert_eq!(result.data(), Some(&1));
    assert_eq!(result.attempts(), 1);
    assert_eq!(later_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_returns_last_error() {
    let operations: Vec<FallbackOperation<'_, ()>> = vec![
        candidate(|| async { Err::<(), _>(presets::unauthorized()) }),
        candidate(|| async { Err::<(), _>(presets::not_found("image")) }),
    ];

    let result = run_with_fallback(operations, &policy(3), None).await;

    assert_eq!(result.error().unwrap().code(), codes::NOT_FOUND);
    assert_eq!(result.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_empty_fallback_chain() {
    let result = run_with_fallback::<()>(Vec::new(), &policy(3), None).await;

    assert_eq!(result.error().unwrap().code(), codes::NO_FALLBACK_OPERATIONS);
    assert_eq!(result.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_stops_when_cancelled() {
    let second_calls = AtomicU32::new(0);
    let token = CancellationToken::new();
    token.cancel();
    let operations: Vec<FallbackOperation<'_, ()>> = vec![
        candidate(|| async { Ok::<_, AppError>(()) }),
        candidate(|| {
            second_calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, AppError>(()) }
        }),
    ];

    let result = run_with_fallback(operations, &policy(3), Some(&token)).await;

    assert_eq!(result.error().unwrap().code(), codes::CANCELLED);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_cancelled_mid_candidate_counts_only_real_attempts() {
    let first_calls = AtomicU32::new(0);
    let second_calls = AtomicU32::new(0);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let operations: Vec<FallbackOperation<'_, ()>> = vec![
        candidate(|| {
            first_calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<Result<(), AppError>>()
        }),
        candidate(|| {
            second_calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, AppError>(()) }
        }),
    ];

    let result = run_with_fallback(operations, &policy(1), Some(&token)).await;

    assert_eq!(result.error().unwrap().code(), codes::CANCELLED);
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_plain_message_failures_are_classified() {
    let result = run_with_retry(
        || async { Err::<(), _>("Failed to fetch") },
        &policy(2),
        None,
    )
    .await;

    let error = result.error().unwrap();
    assert_eq!(error.code(), codes::NETWORK_ERROR);
    assert_eq!(result.attempts(), 2);

    let result = run_with_retry(
        || async { Err::<(), _>(String::from("index out of range")) },
        &policy(3),
        None,
    )
    .await;

    assert_eq!(result.error().unwrap().code(), codes::INTERNAL_ERROR);
    assert_eq!(result.attempts(), 1);
}

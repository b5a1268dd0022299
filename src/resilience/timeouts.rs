//! Per-attempt timeout and cancellation race.
//!
//! # Responsibilities
//! - Race one attempt against its deadline and an external cancellation token
//! - Report a lost race as a failure the classifier understands
//!
//! # Design Decisions
//! - Uses Tokio's select; a losing attempt is dropped, aborting any I/O it had in flight
//! - A zero timeout disables the timer

use std::future::{pending, Future};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::{presets, Failure};

/// Run one attempt, bounded by `timeout` (zero disables it) and `cancel`.
///
/// Whichever settles first decides the outcome: the attempt's own result, a
/// `TIMEOUT` error when the timer fires, or [`Failure::Aborted`] when the
/// token is cancelled.
pub async fn race_attempt<T, E, Fut>(
    attempt: Fut,
    timeout: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<T, Failure>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    let timer = async {
        if timeout.is_zero() {
            pending::<()>().await;
        } else {
            tokio::time::sleep(timeout).await;
        }
    };
    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        result = attempt => result.map_err(Into::into),
        _ = cancelled => {
            tracing::debug!("Attempt dropped: cancelled");
            Err(Failure::Aborted)
        }
        _ = timer => {
            tracing::debug!(
                timeout_ms = timeout.as_millis() as u64,
                "Attempt dropped: timed out"
            );
            Err(Failure::App(presets::timeout()))
        }
    }
}

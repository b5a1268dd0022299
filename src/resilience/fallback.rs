//! Ordered fallback across alternative operations.
//!
//! Each candidate runs through [`run_with_retry`] with the same policy; the
//! chain stops at the first success. Attempt counts are summed over every
//! candidate tried, and when all fail the last candidate's error is returned.

use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::errors::{codes, presets, Failure};
use crate::observability::metrics;
use crate::resilience::retries::{run_with_retry, RetryConfig, RetryResult};

/// One candidate in a fallback chain.
pub type FallbackOperation<'a, T> =
    Box<dyn FnMut() -> BoxFuture<'a, Result<T, Failure>> + Send + 'a>;

/// Box an async closure as a fallback candidate.
pub fn candidate<'a, T, E, F, Fut>(mut operation: F) -> FallbackOperation<'a, T>
where
    F: FnMut() -> Fut + Send + 'a,
    Fut: Future<Output = Result<T, E>> + Send + 'a,
    E: Into<Failure> + 'a,
    T: 'a,
{
    Box::new(move || {
        let attempt = operation();
        async move { attempt.await.map_err(Into::into) }.boxed()
    })
}

/// Try `operations` in order until one succeeds.
///
/// An empty chain is a caller bug and fails immediately with
/// `NO_FALLBACK_OPERATIONS` and zero attempts. A cancelled token stops the
/// chain without starting further candidates.
pub async fn run_with_fallback<'a, T>(
    operations: Vec<FallbackOperation<'a, T>>,
    config: &RetryConfig,
    cancel: Option<&CancellationToken>,
) -> RetryResult<T> {
    if operations.is_empty() {
        tracing::error!("Fallback chain called without operations");
        return RetryResult::Failure {
            error: presets::no_fallback_operations(),
            attempts: 0,
        };
    }

    let candidates = operations.len();
    let mut total_attempts = 0;
    let mut errors = Vec::with_capacity(candidates);

    for (index, mut operation) in operations.into_iter().enumerate() {
        // Cancelled while the previous candidate ran: nothing more is invoked or counted.
        if index > 0 && cancel.is_some_and(|token| token.is_cancelled()) {
            tracing::info!(candidate = index, total_attempts, "Fallback chain cancelled");
            metrics::record_fallback_candidate("cancelled");
            errors.push(presets::cancelled());
            break;
        }

        let result = run_with_retry(|| operation(), config, cancel).await;
        total_attempts += result.attempts();

        match result {
            RetryResult::Success { data, attempts } => {
                if index > 0 {
                    tracing::info!(
                        candidate = index,
                        attempts,
                        total_attempts,
                        "Fallback candidate succeeded"
                    );
                }
                metrics::record_fallback_candidate("success");
                return RetryResult::Success {
                    data,
                    attempts: total_attempts,
                };
            }
            RetryResult::Failure { error, attempts } => {
                tracing::warn!(
                    candidate = index,
                    candidates,
                    attempts,
                    code = error.code(),
                    "Fallback candidate failed"
                );
                metrics::record_fallback_candidate("failure");

                let cancelled = error.code() == codes::CANCELLED;
                errors.push(error);
                if cancelled {
                    break;
                }
            }
        }
    }

    let tried: Vec<&str> = errors.iter().map(|e| e.code()).collect();
    tracing::warn!(?tried, total_attempts, "All fallback candidates failed");

    // Non-empty: at least one candidate ran and failed to get here.
    let error = errors.pop().unwrap_or_else(presets::no_fallback_operations);
    RetryResult::Failure {
        error,
        attempts: total_attempts,
    }
}

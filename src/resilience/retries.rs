//! Retry engine.
//!
//! # Responsibilities
//! - Run an operation up to `max_attempts` times, strictly one after another
//! - Bound every attempt with its own timeout and the caller's cancellation token
//! - Classify each failure once, then ask the policy whether to retry
//! - Wait out an exponential backoff between attempts
//!
//! # Design Decisions
//! - Failure is returned as data ([`RetryResult`]), never raised
//! - Timeout applies per attempt, not to the whole call
//! - Backoff is deterministic unless the policy opts into jitter
//! - Cancellation is checked before each attempt and raced during it

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::validation::{validate_retry_config, ValidationError};
use crate::errors::{classify, presets, AppError, ErrorCategory, Failure};
use crate::observability::metrics;
use crate::resilience::backoff::{apply_jitter, compute_backoff};
use crate::resilience::timeouts::race_attempt;

/// Decides whether a classified failure is worth another attempt.
pub type RetryPredicate = Arc<dyn Fn(&AppError) -> bool + Send + Sync>;

/// Retry unless the input was invalid; otherwise trust the error's own flag.
pub fn default_should_retry(error: &AppError) -> bool {
    error.category() != ErrorCategory::Validation && error.is_retryable()
}

/// Retry policy. Built once per call site (or taken from a preset) and only
/// ever read by the engine.
#[derive(Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff after the first failed attempt.
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    /// Backoff ceiling.
    pub max_delay: Duration,
    /// Per-attempt timeout. Zero disables it.
    pub timeout: Duration,
    /// Random extra delay as a fraction of the backoff. Zero keeps backoff exact.
    pub jitter_ratio: f64,
    pub should_retry: RetryPredicate,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(10_000),
            timeout: Duration::from_millis(10_000),
            jitter_ratio: 0.0,
            should_retry: Arc::new(default_should_retry),
        }
    }
}

impl RetryConfig {
    /// Lenient profile for calls that cross a network boundary to third-party hosts.
    pub fn external_fetch() -> Self {
        Self {
            initial_delay: Duration::from_millis(2000),
            timeout: Duration::from_millis(15_000),
            ..Self::default()
        }
    }

    /// Copy of this policy with every field present in `overrides` replaced.
    pub fn merged(&self, overrides: &RetryOverrides) -> Self {
        Self {
            max_attempts: overrides.max_attempts.unwrap_or(self.max_attempts),
            initial_delay: overrides
                .initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(self.initial_delay),
            backoff_multiplier: overrides
                .backoff_multiplier
                .unwrap_or(self.backoff_multiplier),
            max_delay: overrides
                .max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(self.max_delay),
            timeout: overrides
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(self.timeout),
            jitter_ratio: overrides.jitter_ratio.unwrap_or(self.jitter_ratio),
            should_retry: overrides
                .should_retry
                .clone()
                .unwrap_or_else(|| self.should_retry.clone()),
        }
    }

    pub fn with_should_retry<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&AppError) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    /// Check the policy's value ranges, reporting every violation.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let errors = validate_retry_config("retry", self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Backoff to wait after failed attempt `attempt`, jitter included.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay = compute_backoff(
            attempt,
            self.initial_delay,
            self.backoff_multiplier,
            self.max_delay,
        );
        apply_jitter(delay, self.jitter_ratio)
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("max_delay", &self.max_delay)
            .field("timeout", &self.timeout)
            .field("jitter_ratio", &self.jitter_ratio)
            .finish_non_exhaustive()
    }
}

/// Named policy presets, selectable from configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPreset {
    #[default]
    Default,
    ExternalFetch,
}

impl RetryPreset {
    pub fn config(self) -> RetryConfig {
        match self {
            RetryPreset::Default => RetryConfig::default(),
            RetryPreset::ExternalFetch => RetryConfig::external_fetch(),
        }
    }
}

/// Partial policy: every field is optional and merged over a base [`RetryConfig`].
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryOverrides {
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub max_delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub jitter_ratio: Option<f64>,
    #[serde(skip)]
    pub should_retry: Option<RetryPredicate>,
}

impl fmt::Debug for RetryOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOverrides")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay_ms", &self.initial_delay_ms)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("max_delay_ms", &self.max_delay_ms)
            .field("timeout_ms", &self.timeout_ms)
            .field("jitter_ratio", &self.jitter_ratio)
            .field("should_retry", &self.should_retry.is_some())
            .finish()
    }
}

/// Terminal outcome of a retried call.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryResult<T> {
    Success { data: T, attempts: u32 },
    Failure { error: AppError, attempts: u32 },
}

impl<T> RetryResult<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryResult::Success { attempts, .. } | RetryResult::Failure { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            RetryResult::Success { data, .. } => Some(data),
            RetryResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&AppError> {
        match self {
            RetryResult::Success { .. } => None,
            RetryResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, AppError> {
        match self {
            RetryResult::Success { data, .. } => Ok(data),
            RetryResult::Failure { error, .. } => Err(error),
        }
    }

    pub fn map<U, F>(self, f: F) -> RetryResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            RetryResult::Success { data, attempts } => RetryResult::Success {
                data: f(data),
                attempts,
            },
            RetryResult::Failure { error, attempts } => RetryResult::Failure { error, attempts },
        }
    }
}

/// Run `operation` under `config`, retrying classified failures the policy
/// accepts, until it succeeds or the attempt budget is spent.
///
/// `cancel` is checked before every attempt (returning `CANCELLED` without
/// invoking the operation) and raced against every in-flight attempt
/// (dropping it and reporting a timeout).
pub async fn run_with_retry<T, E, F, Fut>(
    mut operation: F,
    config: &RetryConfig,
    cancel: Option<&CancellationToken>,
) -> RetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    let run_id = Uuid::new_v4();
    let max_attempts = if config.max_attempts == 0 {
        tracing::warn!("max_attempts is 0, running a single attempt");
        1
    } else {
        config.max_attempts
    };
    let span = tracing::debug_span!("retry", %run_id, max_attempts);

    async move {
        let mut attempt: u32 = 1;

        loop {
            if cancel.is_some_and(|token| token.is_cancelled()) {
                tracing::info!(attempt, "Cancelled before attempt started");
                metrics::record_retry_outcome("cancelled", attempt);
                return RetryResult::Failure {
                    error: presets::cancelled(),
                    attempts: attempt,
                };
            }

            tracing::debug!(attempt, "Starting attempt");
            metrics::record_attempt();

            let failure = match race_attempt(operation(), config.timeout, cancel).await {
                Ok(data) => {
                    if attempt > 1 {
                        tracing::info!(attempts = attempt, "Operation succeeded after retry");
                    }
                    metrics::record_retry_outcome("success", attempt);
                    return RetryResult::Success {
                        data,
                        attempts: attempt,
                    };
                }
                Err(failure) => failure,
            };

            let error = classify(failure);
            let retry = (config.should_retry)(&error);

            if !retry || attempt >= max_attempts {
                tracing::warn!(
                    code = error.code(),
                    category = %error.category(),
                    attempts = attempt,
                    retryable = retry,
                    "Operation failed"
                );
                let outcome = if retry { "exhausted" } else { "not_retryable" };
                metrics::record_retry_outcome(outcome, attempt);
                return RetryResult::Failure {
                    error,
                    attempts: attempt,
                };
            }

            let delay = config.delay_after(attempt);
            tracing::warn!(
                code = error.code(),
                category = %error.category(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Attempt failed, retrying"
            );
            metrics::record_backoff(delay);
            wait_backoff(delay, cancel).await;

            attempt += 1;
        }
    }
    .instrument(span)
    .await
}

/// Sleep for `delay`, waking early if the token is cancelled. The loop's
/// next cancellation checkpoint reports it.
async fn wait_backoff(delay: Duration, cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => {}
            }
        }
        None => tokio::time::sleep(delay).await,
    }
}

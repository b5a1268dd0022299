//! Canonical failure value and its validated builder.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::errors::ErrorCategory;

/// Stable error codes emitted by the presets.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INVALID_URL: &str = "INVALID_URL";
    pub const FORBIDDEN_URL: &str = "FORBIDDEN_URL";
    pub const UNSUPPORTED_IMAGE_TYPE: &str = "UNSUPPORTED_IMAGE_TYPE";
    pub const IMAGE_TOO_LARGE: &str = "IMAGE_TOO_LARGE";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";
    pub const UPSTREAM_REJECTED: &str = "UPSTREAM_REJECTED";
    pub const CANCELLED: &str = "CANCELLED";
    pub const NO_FALLBACK_OPERATIONS: &str = "NO_FALLBACK_OPERATIONS";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Transport status for a stable error code. Unknown codes map to 500.
pub fn status_for_code(code: &str) -> u16 {
    match code {
        codes::VALIDATION_ERROR | codes::INVALID_URL => 400,
        codes::UNAUTHORIZED => 401,
        codes::FORBIDDEN_URL => 403,
        codes::NOT_FOUND => 404,
        codes::IMAGE_TOO_LARGE => 413,
        codes::UNSUPPORTED_IMAGE_TYPE => 415,
        codes::UPSTREAM_REJECTED => 424,
        codes::RATE_LIMIT_EXCEEDED => 429,
        codes::CANCELLED => 499,
        codes::NETWORK_ERROR | codes::UPSTREAM_ERROR => 502,
        codes::TIMEOUT => 504,
        _ => 500,
    }
}

/// A classified failure.
///
/// Immutable once built: construct through [`AppError::builder`] or one of the
/// [`presets`](crate::errors::presets).
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{message} ({code})")]
pub struct AppError {
    code: String,
    category: ErrorCategory,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_action: Option<String>,
}

impl AppError {
    pub fn builder() -> AppErrorBuilder {
        AppErrorBuilder::default()
    }

    /// Infallible constructor for presets, whose required fields are literals.
    pub(crate) fn preset(
        code: &'static str,
        category: ErrorCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.to_string(),
            category,
            message: message.into(),
            details: None,
            status_code: Some(status_for_code(code)),
            retryable: category.default_retryable(),
            retry_after_ms: None,
            user_action: None,
        }
    }

    pub(crate) fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub(crate) fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub(crate) fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub(crate) fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after_ms = retry_after.map(saturating_millis);
        self
    }

    pub(crate) fn with_user_action(mut self, action: impl Into<String>) -> Self {
        self.user_action = Some(action.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Diagnostic payload. Never shown to end users.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Suggested wait before a manual retry. Informative only; the retry
    /// engine computes its own backoff.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_ms.map(Duration::from_millis)
    }

    pub fn user_action(&self) -> Option<&str> {
        self.user_action.as_deref()
    }

    /// Message plus remediation hint, for display.
    pub fn display_for_user(&self) -> String {
        match &self.user_action {
            Some(action) => format!("{} {}", self.message, action),
            None => self.message.clone(),
        }
    }
}

/// Whole milliseconds, clamped to `u64::MAX`. Remote hosts choose `Retry-After`.
fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Reasons [`AppErrorBuilder::build`] refuses to produce an error value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("error code is required")]
    MissingCode,

    #[error("error category is required")]
    MissingCategory,

    #[error("error message is required")]
    MissingMessage,
}

/// Validated construction of ad hoc [`AppError`] values.
#[derive(Debug, Clone, Default)]
pub struct AppErrorBuilder {
    code: Option<String>,
    category: Option<ErrorCategory>,
    message: Option<String>,
    details: Option<Value>,
    status_code: Option<u16>,
    retryable: Option<bool>,
    retry_after: Option<Duration>,
    user_action: Option<String>,
}

impl AppErrorBuilder {
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Overrides the category default.
    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn user_action(mut self, action: impl Into<String>) -> Self {
        self.user_action = Some(action.into());
        self
    }

    /// Validate required fields and produce the error value.
    pub fn build(self) -> Result<AppError, BuildError> {
        let code = self
            .code
            .filter(|c| !c.trim().is_empty())
            .ok_or(BuildError::MissingCode)?;
        let category = self.category.ok_or(BuildError::MissingCategory)?;
        let message = self
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or(BuildError::MissingMessage)?;

        Ok(AppError {
            retryable: self.retryable.unwrap_or(category.default_retryable()),
            code,
            category,
            message,
            details: self.details,
            status_code: self.status_code,
            retry_after_ms: self.retry_after.map(saturating_millis),
            user_action: self.user_action,
        })
    }
}

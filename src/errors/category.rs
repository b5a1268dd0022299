//! Error categories and their default retry policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad failure class. Drives the default handling policy of an [`AppError`].
///
/// [`AppError`]: crate::errors::AppError
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Bad input. Resubmitting it unchanged cannot succeed.
    Validation,
    /// Transport-level failure between us and a remote host.
    Network,
    /// Missing or rejected credentials; needs user action.
    Auth,
    /// Limits and missing resources (quota, size, rate, not found).
    Resource,
    /// Third-party service misbehaving.
    External,
    /// Anything we could not classify.
    Internal,
}

impl ErrorCategory {
    /// Whether errors of this category are retryable unless overridden.
    pub fn default_retryable(self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::External)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Validation => "VALIDATION",
            ErrorCategory::Network => "NETWORK",
            ErrorCategory::Auth => "AUTH",
            ErrorCategory::Resource => "RESOURCE",
            ErrorCategory::External => "EXTERNAL",
            ErrorCategory::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Preset constructors, one per failure kind the crate knows about.
//!
//! Call sites use these instead of assembling error values by hand, which is
//! what keeps the set of codes closed.

use serde_json::json;
use std::time::Duration;

use crate::errors::{codes, AppError, ErrorCategory};

pub fn validation(message: impl Into<String>) -> AppError {
    AppError::preset(codes::VALIDATION_ERROR, ErrorCategory::Validation, message)
        .with_user_action("Check the input and try again.")
}

pub fn invalid_url(url: &str, reason: impl Into<String>) -> AppError {
    AppError::preset(
        codes::INVALID_URL,
        ErrorCategory::Validation,
        "The image URL is not valid.",
    )
    .with_details(json!({ "url": url, "reason": reason.into() }))
    .with_user_action("Enter a complete http:// or https:// address.")
}

pub fn forbidden_url(reason: impl Into<String>) -> AppError {
    AppError::preset(
        codes::FORBIDDEN_URL,
        ErrorCategory::Validation,
        "This URL cannot be used as an image source.",
    )
    .with_details(json!({ "reason": reason.into() }))
    .with_user_action("Use a publicly reachable image URL.")
}

pub fn unsupported_image_type(content_type: &str) -> AppError {
    AppError::preset(
        codes::UNSUPPORTED_IMAGE_TYPE,
        ErrorCategory::Validation,
        "The URL does not point to an image.",
    )
    .with_details(json!({ "contentType": content_type }))
    .with_user_action("Link directly to a PNG, JPEG, GIF or WebP file.")
}

pub fn image_too_large(size: u64, max: u64) -> AppError {
    AppError::preset(
        codes::IMAGE_TOO_LARGE,
        ErrorCategory::Resource,
        format!("The image is too large ({size} bytes, limit {max} bytes)."),
    )
    .with_details(json!({ "size": size, "max": max }))
    .with_user_action("Use a smaller or more compressed image.")
}

pub fn unauthorized() -> AppError {
    AppError::preset(
        codes::UNAUTHORIZED,
        ErrorCategory::Auth,
        "The image host refused access.",
    )
    .with_user_action("Make sure the image is publicly accessible.")
}

pub fn not_found(resource: impl Into<String>) -> AppError {
    let resource = resource.into();
    AppError::preset(
        codes::NOT_FOUND,
        ErrorCategory::Resource,
        format!("{resource} was not found."),
    )
    .with_details(json!({ "resource": resource }))
    .with_user_action("Check that the link is still valid.")
}

/// Rate limited by a remote host. Retryable; carries the host's hint.
pub fn rate_limit_exceeded(retry_after: Option<Duration>) -> AppError {
    AppError::preset(
        codes::RATE_LIMIT_EXCEEDED,
        ErrorCategory::Resource,
        "Too many requests were made to the image host.",
    )
    .with_retryable(true)
    .with_retry_after(retry_after)
    .with_user_action("Wait a moment before trying again.")
}

pub fn timeout() -> AppError {
    AppError::preset(
        codes::TIMEOUT,
        ErrorCategory::Network,
        "The request took too long to complete.",
    )
    .with_user_action("Check your connection and try again.")
}

pub fn network_error(details: impl Into<String>) -> AppError {
    AppError::preset(
        codes::NETWORK_ERROR,
        ErrorCategory::Network,
        "A network error occurred.",
    )
    .with_details(json!({ "cause": details.into() }))
    .with_user_action("Check your connection and try again.")
}

/// 5xx from a third-party host.
pub fn upstream_error(status: u16) -> AppError {
    AppError::preset(
        codes::UPSTREAM_ERROR,
        ErrorCategory::External,
        "The image host is having problems.",
    )
    .with_status(status)
    .with_details(json!({ "upstreamStatus": status }))
    .with_user_action("Try again later.")
}

/// A 4xx from a third-party host that no other preset covers.
pub fn upstream_rejected(status: u16) -> AppError {
    AppError::preset(
        codes::UPSTREAM_REJECTED,
        ErrorCategory::External,
        "The image host rejected the request.",
    )
    .with_retryable(false)
    .with_details(json!({ "upstreamStatus": status }))
}

pub fn cancelled() -> AppError {
    AppError::preset(
        codes::CANCELLED,
        ErrorCategory::Internal,
        "The operation was cancelled.",
    )
}

pub fn no_fallback_operations() -> AppError {
    AppError::preset(
        codes::NO_FALLBACK_OPERATIONS,
        ErrorCategory::Internal,
        "No operations were supplied to the fallback chain.",
    )
}

pub fn internal(message: impl Into<String>) -> AppError {
    let message = message.into();
    let message = if message.trim().is_empty() {
        "An unexpected error occurred.".to_string()
    } else {
        message
    };
    AppError::preset(codes::INTERNAL_ERROR, ErrorCategory::Internal, message)
        .with_user_action("Try again. If the problem persists, report it.")
}

/// Map a transport status from a remote host onto a preset.
pub fn from_http_status(status: u16, retry_after: Option<Duration>) -> AppError {
    match status {
        401 | 403 => unauthorized().with_status(status),
        404 | 410 => not_found("The image").with_status(status),
        408 | 504 => timeout().with_status(status),
        429 => rate_limit_exceeded(retry_after),
        500..=599 => upstream_error(status),
        _ => upstream_rejected(status),
    }
}

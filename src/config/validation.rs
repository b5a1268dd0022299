//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges of the effective retry policies
//! - Check proxy templates are usable URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{AppConfig, FetchConfig, ObservabilityConfig};
use crate::resilience::RetryConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a whole configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_observability(&config.observability, &mut errors);
    errors.extend(validate_retry_config("retry", &config.retry_policy()));
    validate_fetch(&config.fetch, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Range checks for a retry policy; `prefix` names it in error fields.
pub fn validate_retry_config(prefix: &str, config: &RetryConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.max_attempts < 1 {
        errors.push(ValidationError::new(
            format!("{prefix}.max_attempts"),
            "must be at least 1",
        ));
    }
    if !config.backoff_multiplier.is_finite() || config.backoff_multiplier < 1.0 {
        errors.push(ValidationError::new(
            format!("{prefix}.backoff_multiplier"),
            "must be a finite number >= 1",
        ));
    }
    if config.max_delay < config.initial_delay {
        errors.push(ValidationError::new(
            format!("{prefix}.max_delay_ms"),
            "must be >= initial_delay_ms",
        ));
    }
    if !(0.0..=1.0).contains(&config.jitter_ratio) {
        errors.push(ValidationError::new(
            format!("{prefix}.jitter_ratio"),
            "must be between 0 and 1",
        ));
    }

    errors
}

fn validate_observability(config: &ObservabilityConfig, errors: &mut Vec<ValidationError>) {
    let level = config.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.log_level),
        ));
    }
}

fn validate_fetch(config: &FetchConfig, errors: &mut Vec<ValidationError>) {
    errors.extend(validate_retry_config("fetch.retry", &config.retry_policy()));

    if config.max_image_bytes == 0 {
        errors.push(ValidationError::new("fetch.max_image_bytes", "must be > 0"));
    }
    if config.allowed_schemes.is_empty() {
        errors.push(ValidationError::new(
            "fetch.allowed_schemes",
            "at least one scheme is required",
        ));
    }
    if config.allowed_schemes.iter().any(|s| s.trim().is_empty()) {
        errors.push(ValidationError::new(
            "fetch.allowed_schemes",
            "schemes must not be blank",
        ));
    }

    for (i, template) in config.proxy_urls.iter().enumerate() {
        let field = format!("fetch.proxy_urls[{i}]");
        if !template.contains("{url}") {
            errors.push(ValidationError::new(field, "missing {url} placeholder"));
            continue;
        }
        if let Err(e) = url::Url::parse(&template.replace("{url}", "x")) {
            errors.push(ValidationError::new(field, format!("not an absolute URL: {e}")));
        }
    }
}

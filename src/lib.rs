//! Resilient execution core for the Before/After image comparison tool.
//!
//! Fallible async operations (chiefly fetching third-party images) run
//! through a retry/timeout/fallback engine, and every failure is normalized
//! into one error taxonomy.

// Core
pub mod errors;
pub mod resilience;

// Call sites
pub mod fetch;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use errors::{classify, AppError, ErrorCategory, Failure};
pub use fetch::ImageFetcher;
pub use resilience::{run_with_fallback, run_with_retry, RetryConfig, RetryResult};

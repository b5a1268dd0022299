//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Operation from a call site:
//!     → retries.rs (attempt loop, policy, result as data)
//!         → timeouts.rs (race attempt vs timer vs cancellation)
//!         → errors::classify (normalize the failure)
//!         → backoff.rs (delay before the next attempt)
//!
//! Several alternative operations:
//!     → fallback.rs (one retried run per candidate, in order)
//! ```
//!
//! # Design Decisions
//! - Attempts are strictly sequential; the only concurrency is the per-attempt race
//! - Every attempt has its own deadline
//! - No state is shared between calls

pub mod backoff;
pub mod fallback;
pub mod retries;
pub mod timeouts;

pub use fallback::{candidate, run_with_fallback, FallbackOperation};
pub use retries::{
    default_should_retry, run_with_retry, RetryConfig, RetryOverrides, RetryPredicate,
    RetryPreset, RetryResult,
};

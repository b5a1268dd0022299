//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! errors, resilience, fetch produce:
//!     → logging.rs (structured tracing events and spans)
//!     → metrics.rs (counters, histograms)
//! ```
//!
//! # Design Decisions
//! - Error context travels as structured fields (code, category, attempt)
//! - Each retried call runs inside a span carrying its run ID

pub mod logging;
pub mod metrics;

//! Error taxonomy.
//!
//! # Data Flow
//! ```text
//! Call site failure (io, reqwest, AppError, plain message, nothing at all)
//!     → classify.rs (Failure → AppError, total)
//!     → AppError (code, category, message, retryable, retry_after, ...)
//!     → resilience retry predicate / caller rendering
//!
//! Call sites that know what went wrong:
//!     → presets.rs (one constructor per failure kind)
//!     → app_error.rs builder (validated construction for anything else)
//! ```
//!
//! # Design Decisions
//! - One canonical failure shape for the whole crate
//! - Presets keep the set of codes closed and enumerable
//! - Classification never fails and never panics

pub mod app_error;
pub mod category;
pub mod classify;
pub mod presets;

pub use app_error::{codes, status_for_code, AppError, AppErrorBuilder, BuildError};
pub use category::ErrorCategory;
pub use classify::{classify, Failure};

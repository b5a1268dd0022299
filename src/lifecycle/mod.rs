//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! Ctrl-C
//!     → signals.rs
//!     → CancellationToken.cancel()
//!     → resilience engine checkpoints (before attempt, during attempt race)
//! ```

pub mod signals;

pub use signals::cancel_on_ctrl_c;

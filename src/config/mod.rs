//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks on the effective policies)
//!     → AppConfig (validated, immutable)
//!     → retry policies handed to the engine by reference
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Retry sections are partial overrides merged over a named preset

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AppConfig, FetchConfig, ObservabilityConfig};
pub use validation::ValidationError;

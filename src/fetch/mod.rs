//! Image fetching subsystem.
//!
//! # Data Flow
//! ```text
//! user-supplied URL
//!     → url_policy.rs (parse, scheme/host/credential checks → ImageUrl)
//!     → strategies.rs (plan: direct, then proxy templates)
//!     → resilience::run_with_fallback (retry each candidate in order)
//!         → client.rs (one GET, status/type/size checks)
//!     → RetryResult<FetchedImage>
//! ```
//!
//! # Design Decisions
//! - URL policy runs before the engine; its errors are never retried
//! - Proxies exist to route around hosts that refuse direct access

pub mod client;
pub mod strategies;
pub mod url_policy;

pub use client::{FetchSource, FetchedImage, ImageFetcher};
pub use url_policy::{validate_image_url, ImageUrl};

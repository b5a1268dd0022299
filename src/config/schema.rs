//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files, and
//! every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::resilience::{RetryConfig, RetryOverrides, RetryPreset};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Overrides merged over the default retry preset, for general operations.
    pub retry: RetryOverrides,

    /// Image fetching settings.
    pub fetch: FetchConfig,
}

impl AppConfig {
    /// Effective policy for general operations.
    pub fn retry_policy(&self) -> RetryConfig {
        RetryConfig::default().merged(&self.retry)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,

    /// Serve Prometheus metrics on this address. No exporter when unset.
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_addr: None,
        }
    }
}

/// Image fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Base retry preset for fetches.
    pub profile: RetryPreset,

    /// Overrides merged over `profile`.
    pub retry: RetryOverrides,

    /// User-Agent header sent to image hosts.
    pub user_agent: String,

    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Largest accepted image body in bytes.
    pub max_image_bytes: u64,

    /// URL schemes accepted as image sources.
    pub allowed_schemes: Vec<String>,

    /// Accept loopback, private and link-local hosts.
    pub allow_private_hosts: bool,

    /// Honour HTTP(S)_PROXY environment variables.
    pub use_system_proxy: bool,

    /// Image proxy URL templates tried after the direct fetch, in order.
    /// `{url}` is replaced with the form-encoded source URL.
    pub proxy_urls: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            profile: RetryPreset::ExternalFetch,
            retry: RetryOverrides::default(),
            user_agent: concat!("before-after/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout_ms: 5000,
            max_image_bytes: 10 * 1024 * 1024, // 10 MiB
            allowed_schemes: vec!["http".to_string(), "https".to_string()],
            allow_private_hosts: false,
            use_system_proxy: true,
            proxy_urls: Vec::new(),
        }
    }
}

impl FetchConfig {
    /// Effective policy for image fetches.
    pub fn retry_policy(&self) -> RetryConfig {
        self.profile.config().merged(&self.retry)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

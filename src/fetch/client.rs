//! HTTP client for third-party image hosts.
//!
//! # Responsibilities
//! - Perform a single GET for an image URL
//! - Map non-success responses onto error presets
//! - Enforce content type and size limits while reading the body
//!
//! # Design Decisions
//! - No request timeout here; the retry engine bounds every attempt
//! - Redirects are re-checked against the host policy
//! - Errors are returned unclassified so the engine classifies them once

use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::redirect;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::config::FetchConfig;
use crate::errors::{presets, AppError, Failure};
use crate::fetch::url_policy::check_host;
use crate::resilience::RetryConfig;

const MAX_REDIRECTS: usize = 10;

/// Where a fetched image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchSource {
    /// Straight from the image host.
    Direct,
    /// Through the configured proxy template at `index`.
    Proxy { index: usize },
}

/// A downloaded image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedImage {
    pub source: FetchSource,
    /// Final URL after redirects.
    pub url: String,
    pub content_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl FetchedImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Image fetcher with its HTTP client and retry policy.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    pub(crate) client: reqwest::Client,
    pub(crate) config: FetchConfig,
    pub(crate) policy: RetryConfig,
}

impl ImageFetcher {
    /// Build a fetcher from configuration.
    pub fn new(config: FetchConfig) -> Result<Self, AppError> {
        let allow_private = config.allow_private_hosts;
        let redirects = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.stop();
            }
            match check_host(attempt.url(), allow_private) {
                Ok(()) => attempt.follow(),
                Err(e) => attempt.error(e),
            }
        });

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout())
            .redirect(redirects);
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| presets::internal(format!("failed to build HTTP client: {e}")))?;

        let policy = config.retry_policy();
        tracing::debug!(
            max_attempts = policy.max_attempts,
            timeout_ms = policy.timeout.as_millis() as u64,
            proxies = config.proxy_urls.len(),
            "Image fetcher initialized"
        );

        Ok(Self {
            client,
            config,
            policy,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Policy applied to every candidate of a fetch.
    pub fn policy(&self) -> &RetryConfig {
        &self.policy
    }

    /// One GET, no retries.
    pub async fn fetch_once(
        &self,
        url: &Url,
        source: FetchSource,
    ) -> Result<FetchedImage, Failure> {
        tracing::debug!(url = %url, ?source, "Fetching image");

        let mut response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            tracing::debug!(
                url = %url,
                status = status.as_u16(),
                "Image host returned error status"
            );
            return Err(presets::from_http_status(status.as_u16(), retry_after).into());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return Err(presets::unsupported_image_type(&content_type).into());
        }

        let max = self.config.max_image_bytes;
        if let Some(declared) = response.content_length() {
            if declared > max {
                return Err(presets::image_too_large(declared, max).into());
            }
        }

        let final_url = response.url().to_string();
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            bytes.extend_from_slice(&chunk);
            if bytes.len() as u64 > max {
                return Err(presets::image_too_large(bytes.len() as u64, max).into());
            }
        }

        Ok(FetchedImage {
            source,
            url: final_url,
            content_type,
            bytes,
        })
    }
}

/// `Retry-After` in its delay-seconds form. HTTP dates are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

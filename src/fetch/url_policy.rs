//! Image source URL policy.
//!
//! # Responsibilities
//! - Parse user-supplied image URLs
//! - Reject schemes, hosts and credentials we refuse to fetch from
//! - Expand image-proxy templates around an accepted URL
//!
//! # Design Decisions
//! - Policy failures are VALIDATION errors, so the engine never retries them
//! - Private and loopback hosts are refused unless explicitly allowed
//! - The same host check guards redirects

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{form_urlencoded, Host, Url};

use crate::config::FetchConfig;
use crate::errors::{presets, AppError};

/// A URL that passed [`validate_image_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrl(Url);

impl ImageUrl {
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ImageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Parse `raw` and apply the configured source policy.
pub fn validate_image_url(raw: &str, config: &FetchConfig) -> Result<ImageUrl, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(presets::invalid_url(raw, "empty URL"));
    }

    let url = Url::parse(trimmed).map_err(|e| presets::invalid_url(raw, e.to_string()))?;

    let scheme_allowed = config
        .allowed_schemes
        .iter()
        .any(|s| s.eq_ignore_ascii_case(url.scheme()));
    if !scheme_allowed {
        return Err(presets::forbidden_url(format!(
            "scheme '{}' is not allowed",
            url.scheme()
        )));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(presets::forbidden_url("URL contains credentials"));
    }

    check_host(&url, config.allow_private_hosts)?;

    Ok(ImageUrl(url))
}

/// Refuse URLs without a host, and private hosts unless `allow_private`.
pub fn check_host(url: &Url, allow_private: bool) -> Result<(), AppError> {
    let host = url
        .host()
        .ok_or_else(|| presets::invalid_url(url.as_str(), "missing host"))?;

    if allow_private {
        return Ok(());
    }

    let private = match &host {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Host::Ipv4(ip) => is_private_v4(*ip),
        Host::Ipv6(ip) => is_private_v6(*ip),
    };

    if private {
        return Err(presets::forbidden_url(format!(
            "host '{host}' is not publicly reachable"
        )));
    }
    Ok(())
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || (a == 100 && (b & 0xc0) == 64) // shared address space, 100.64.0.0/10
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || (first & 0xfe00) == 0xfc00 // unique local
        || (first & 0xffc0) == 0xfe80 // link local
}

/// Substitute the form-encoded source URL for `{url}` in a proxy template.
pub fn expand_proxy_template(template: &str, source: &ImageUrl) -> Result<Url, AppError> {
    let encoded: String = form_urlencoded::byte_serialize(source.as_str().as_bytes()).collect();
    let expanded = template.replace("{url}", &encoded);

    Url::parse(&expanded)
        .map_err(|e| presets::internal(format!("invalid proxy template '{template}': {e}")))
}

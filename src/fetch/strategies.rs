//! Fetch strategies: direct first, then each image proxy in order.

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::fetch::client::{FetchSource, FetchedImage, ImageFetcher};
use crate::fetch::url_policy::{expand_proxy_template, ImageUrl};
use crate::observability::metrics;
use crate::resilience::{candidate, run_with_fallback, FallbackOperation, RetryResult};

impl ImageFetcher {
    /// Ordered candidate targets for `source`. Templates that fail to expand
    /// are skipped.
    pub fn fetch_plan(&self, source: &ImageUrl) -> Vec<(FetchSource, Url)> {
        let mut plan = vec![(FetchSource::Direct, source.as_url().clone())];

        for (index, template) in self.config.proxy_urls.iter().enumerate() {
            match expand_proxy_template(template, source) {
                Ok(url) => plan.push((FetchSource::Proxy { index }, url)),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping unusable proxy template");
                }
            }
        }

        plan
    }

    /// Fetch an image through the fallback chain, retrying each candidate
    /// under the fetcher's policy.
    pub async fn fetch_image(
        &self,
        source: &ImageUrl,
        cancel: Option<&CancellationToken>,
    ) -> RetryResult<FetchedImage> {
        let operations: Vec<FallbackOperation<'_, FetchedImage>> = self
            .fetch_plan(source)
            .into_iter()
            .map(|(kind, target)| {
                candidate(move || {
                    let target = target.clone();
                    async move { self.fetch_once(&target, kind).await }
                })
            })
            .collect();

        let result = run_with_fallback(operations, &self.policy, cancel).await;

        match &result {
            RetryResult::Success { data, attempts } => {
                metrics::record_image_bytes(data.len());
                tracing::info!(
                    url = %source,
                    source = ?data.source,
                    bytes = data.len(),
                    attempts,
                    "Image fetched"
                );
            }
            RetryResult::Failure { error, attempts } => {
                tracing::warn!(
                    url = %source,
                    code = error.code(),
                    attempts,
                    "Image fetch failed"
                );
            }
        }

        result
    }
}

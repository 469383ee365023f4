//! URL → validated [`CrawlResult`].

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn, Span};
use url::Url;

use crate::error::{CrawlError, Result};
use crate::http_client::PageFetcher;
use crate::result::CrawlResult;
use crate::shop::ShopRegistry;

/// Dispatches product URLs to the shop registered for their host.
///
/// Holds no per-crawl state, so one instance can serve concurrent crawls.
pub struct Crawler {
    registry: ShopRegistry,
    fetcher: Arc<dyn PageFetcher>,
}

impl Crawler {
    pub fn new(registry: ShopRegistry, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { registry, fetcher }
    }

    /// Crawl one product page.
    ///
    /// Unknown or disabled hosts fail with
    /// [`CrawlError::WebsiteNotImplemented`] before anything is fetched. On
    /// success `on_sale` is recomputed from the discount price and the
    /// result is validated.
    #[instrument(skip(self), fields(shop = tracing::field::Empty))]
    pub async fn crawl(&self, url: &str) -> Result<CrawlResult> {
        let hostname = hostname(url).ok_or_else(|| {
            info!("url has no hostname");
            CrawlError::not_implemented(url, "")
        })?;

        let Some(shop) = self.registry.resolve(&hostname) else {
            info!(%hostname, "no enabled shop for hostname");
            return Err(CrawlError::not_implemented(url, &hostname));
        };
        Span::current().record("shop", shop.extractor.name());
        debug!(shop = shop.display_name, "resolved shop");

        let mut result = shop
            .extractor
            .extract(url, self.fetcher.as_ref())
            .await
            .inspect_err(|e| match e {
                CrawlError::PageNotFound { .. } => {
                    info!(shop = shop.display_name, "product page is gone");
                }
                _ => warn!(shop = shop.display_name, error = %e, "extraction failed"),
            })?;
        result.on_sale = result.discount_price > 0.0;

        if let Err(invalid) = result.validate() {
            error!(
                shop = shop.display_name,
                %result,
                error = %invalid,
                "extractor produced an invalid result"
            );
            return Err(invalid.into());
        }

        debug!(%result, "crawl finished");
        Ok(result)
    }
}

fn hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(str::to_ascii_lowercase)
}

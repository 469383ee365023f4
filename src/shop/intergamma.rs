//! Gamma (gamma.nl) and Karwei (karwei.nl).
//!
//! Both shops run on the same Intergamma platform and expose schema.org
//! microdata on the product page.

use async_trait::async_trait;
use scraper::Html;
use tracing::debug;

use super::page::{attr, first, first_in, optional, parse_ean, parse_price, text};
use super::Extractor;
use crate::error::{CrawlError, Result};
use crate::http_client::{fetch_page, PageFetcher, StatusPolicy};
use crate::result::CrawlResult;

const PRODUCT: &str = r#"div[itemtype="http://schema.org/Product"]"#;

/// Intergamma extractor labelled with the shop it serves.
pub struct IntergammaExtractor {
    shop: &'static str,
}

impl IntergammaExtractor {
    #[must_use]
    pub fn gamma() -> Self {
        Self { shop: "gamma" }
    }

    #[must_use]
    pub fn karwei() -> Self {
        Self { shop: "karwei" }
    }
}

#[async_trait]
impl Extractor for IntergammaExtractor {
    fn name(&self) -> &'static str {
        self.shop
    }

    async fn extract(&self, url: &str, fetcher: &dyn PageFetcher) -> Result<CrawlResult> {
        let html = fetch_page(fetcher, self.shop, url, url, &[], StatusPolicy::RequireOk).await?;
        parse_page(self.shop, url, &html)
    }
}

pub(crate) fn parse_page(shop: &'static str, url: &str, html: &str) -> Result<CrawlResult> {
    let doc = Html::parse_document(html);

    let canonical = first(&doc, r#"link[itemprop="url"]"#)
        .and_then(|el| attr(el, "href"))
        .unwrap_or_else(|| {
            debug!(shop, "no canonical url, keeping request url");
            url.to_string()
        });
    let mut result = CrawlResult::new(canonical);

    result.product_name = first(&doc, r#"h1[itemprop="name"]"#)
        .and_then(text)
        .ok_or_else(|| CrawlError::missing(shop, "name"))?;

    let product = first(&doc, PRODUCT);
    result.product_code = product
        .and_then(|el| attr(el, "data-product-code"))
        .ok_or_else(|| CrawlError::missing(shop, "data-product-code"))?;
    let ean = product
        .and_then(|el| attr(el, "data-ean"))
        .as_deref()
        .and_then(parse_ean);
    result.ean = optional(shop, "ean", ean);

    let price_tag =
        first(&doc, "div.product-price").ok_or_else(|| CrawlError::missing(shop, "product-price"))?;
    let price = first_in(price_tag, r#"meta[itemprop="price"]"#)
        .and_then(|el| attr(el, "content"))
        .as_deref()
        .and_then(parse_price)
        .ok_or_else(|| CrawlError::missing(shop, "price"))?;

    if price > 0.0 && price_tag.value().classes().any(|class| class == "promotion") {
        result.discount_price = price;
        result.on_sale = true;
    } else {
        result.normal_price = price;
    }

    Ok(result)
}

//! Brandzaak (brandzaak.nl).

use async_trait::async_trait;
use scraper::Html;

use super::page::{meta, parse_price};
use super::Extractor;
use crate::error::{CrawlError, Result};
use crate::http_client::{fetch_page, PageFetcher, StatusPolicy};
use crate::result::CrawlResult;

const SHOP: &str = "brandzaak";

pub struct BrandzaakExtractor;

#[async_trait]
impl Extractor for BrandzaakExtractor {
    fn name(&self) -> &'static str {
        SHOP
    }

    async fn extract(&self, url: &str, fetcher: &dyn PageFetcher) -> Result<CrawlResult> {
        let html = fetch_page(fetcher, SHOP, url, url, &[], StatusPolicy::RequireOk).await?;
        parse_page(url, &html)
    }
}

pub(crate) fn parse_page(url: &str, html: &str) -> Result<CrawlResult> {
    let doc = Html::parse_document(html);
    let mut result = CrawlResult::new(url);

    let title = meta(&doc, "title").ok_or_else(|| CrawlError::missing(SHOP, "title"))?;
    result.product_code = title.replace(' ', "-");
    result.product_name = title;
    result.normal_price = meta(&doc, "product:price:amount")
        .as_deref()
        .and_then(parse_price)
        .ok_or_else(|| CrawlError::missing(SHOP, "product:price:amount"))?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_title_and_price_meta() {
        let html = r#"<html><head>
            <meta name="title" content="Brandblusser 2 kg poeder">
            <meta property="product:price:amount" content="39.95">
            </head></html>"#;
        let r = parse_page("https://www.brandzaak.nl/brandblusser-2kg", html).unwrap();
        assert_eq!(r.product_name, "Brandblusser 2 kg poeder");
        assert_eq!(r.product_code, "Brandblusser-2-kg-poeder");
        assert_eq!(r.normal_price, 39.95);
    }

    #[test]
    fn missing_price_fails() {
        let html = r#"<meta name="title" content="Blusdeken">"#;
        let err = parse_page("https://www.brandzaak.nl/blusdeken", html).unwrap_err();
        assert!(err.to_string().contains("product:price:amount"));
    }
}

//! Simon Lévelt (simonlevelt.nl) via Open Graph product meta tags.
//!
//! There is no product code on the page; the title doubles as one.

use async_trait::async_trait;
use scraper::Html;
use tracing::info;

use super::page::meta;
use super::Extractor;
use crate::error::{CrawlError, Result};
use crate::http_client::{fetch_page, PageFetcher, StatusPolicy};
use crate::result::CrawlResult;

const SHOP: &str = "simonlevelt";

pub struct SimonLeveltExtractor;

#[async_trait]
impl Extractor for SimonLeveltExtractor {
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

    let canonical = meta(&doc, "product:product_link").unwrap_or_else(|| {
        info!(url, "no product link, keeping request url");
        url.to_string()
    });
    let mut result = CrawlResult::new(canonical);

    let name = meta(&doc, "og:title").ok_or_else(|| CrawlError::missing(SHOP, "og:title"))?;
    result.product_code = name.replace(' ', "_");
    result.product_name = name;

    result.normal_price = meta(&doc, "product:price")
        .as_deref()
        .and_then(parse_dutch_number)
        .ok_or_else(|| CrawlError::missing(SHOP, "product:price"))?;

    Ok(result)
}

/// "1.234,50" → 1234.5. Without a decimal comma the value is read as-is.
/// Only finite values count.
fn parse_dutch_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let normalized = if raw.contains(',') {
        raw.replace('.', "").replace(',', ".")
    } else {
        raw.to_string()
    };
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.simonlevelt.nl/koffie/bonen/brazilie-santos";

    fn page(price: &str) -> String {
        format!(
            r#"<html><head>
            <meta property="og:title" content="Brazilië Santos">
            <meta property="product:product_link" content="https://www.simonlevelt.nl/brazilie-santos">
            <meta property="product:price" content="{price}">
            </head></html>"#
        )
    }

    #[test]
    fn title_doubles_as_code() {
        let r = parse_page(URL, &page("7,95")).unwrap();
        assert_eq!(r.url, "https://www.simonlevelt.nl/brazilie-santos");
        assert_eq!(r.product_name, "Brazilië Santos");
        assert_eq!(r.product_code, "Brazilië_Santos");
        assert_eq!(r.normal_price, 7.95);
    }

    #[test]
    fn dutch_number_format() {
        assert_eq!(parse_dutch_number("1.234,50"), Some(1234.5));
        assert_eq!(parse_dutch_number("12"), Some(12.0));
        assert_eq!(parse_dutch_number("12.5"), Some(12.5));
        assert_eq!(parse_dutch_number("gratis"), None);
        assert_eq!(parse_dutch_number("NaN"), None);
        assert_eq!(parse_dutch_number("inf"), None);
    }

    #[test]
    fn non_numeric_price_fails() {
        assert!(parse_page(URL, &page("NaN")).unwrap_err().is_extraction_failure());
    }

    #[test]
    fn missing_price_fails() {
        let err = parse_page(URL, &page("")).unwrap_err();
        assert!(err.to_string().contains("product:price"));
    }
}

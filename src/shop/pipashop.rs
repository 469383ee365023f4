//! Pipa Shop (pipa-shop.nl).

use async_trait::async_trait;
use scraper::Html;

use super::page::{first, parse_price, text};
use super::Extractor;
use crate::error::{CrawlError, Result};
use crate::http_client::{fetch_page, PageFetcher, StatusPolicy};
use crate::result::CrawlResult;

const SHOP: &str = "pipashop";

pub struct PipaShopExtractor;

#[async_trait]
impl Extractor for PipaShopExtractor {
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

    let price: String = first(&doc, "div.product-price")
        .and_then(text)
        .ok_or_else(|| CrawlError::missing(SHOP, "product-price"))?
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    result.normal_price = parse_price(&price).ok_or_else(|| CrawlError::missing(SHOP, "price"))?;

    result.product_name = first(&doc, "div.product-title a")
        .and_then(text)
        .ok_or_else(|| CrawlError::missing(SHOP, "product-title"))?;
    result.product_code =
        product_slug(url).ok_or_else(|| CrawlError::missing(SHOP, "product code"))?;

    Ok(result)
}

/// `https://pipa-shop.nl/product/pipa-mok/` → "pipa-mok".
fn product_slug(url: &str) -> Option<String> {
    let tail = url.rsplit("/product/").next()?;
    let slug = tail.split('/').next()?;
    (!slug.is_empty()).then(|| slug.to_string())
}

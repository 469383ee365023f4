//! Etos (etos.nl) via the analytics payload on the product detail block.
//!
//! The `data-gtm-event` attribute holds an enhanced-ecommerce JSON object.
//! Promotions are only given as sticker text (`dimension20`), so the
//! discount has to be derived with [`parse_promotion`].

use async_trait::async_trait;
use scraper::Html;
use serde_json::Value;
use tracing::{debug, info};

use super::page::{attr, first, json_f64, json_string};
use super::Extractor;
use crate::error::{CrawlError, Result};
use crate::http_client::{fetch_page, PageFetcher, StatusPolicy};
use crate::promotion::parse_promotion;
use crate::result::CrawlResult;

const SHOP: &str = "etos";

pub struct EtosExtractor;

#[async_trait]
impl Extractor for EtosExtractor {
    fn name(&self) -> &'static str {
        SHOP
    }

    async fn extract(&self, url: &str, fetcher: &dyn PageFetcher) -> Result<CrawlResult> {
        let html = fetch_page(fetcher, SHOP, url, url, &[], StatusPolicy::RequireOk).await?;
        parse_page(url, &html)
    }
}

pub(crate) fn parse_page(url: &str, html: &str) -> Result<CrawlResult> {
    let raw = {
        let doc = Html::parse_document(html);
        first(&doc, "div.js-product-detail")
            .and_then(|el| attr(el, "data-gtm-event"))
            .ok_or_else(|| CrawlError::missing(SHOP, "data-gtm-event"))?
    };

    let event: Value = serde_json::from_str(&raw).map_err(|e| CrawlError::json(SHOP, &e))?;
    let offer = event
        .pointer("/ecommerce/detail/products/0")
        .ok_or_else(|| CrawlError::missing(SHOP, "ecommerce.detail.products"))?;

    let mut result = CrawlResult::new(url);
    result.product_name =
        json_string(offer, "name").ok_or_else(|| CrawlError::missing(SHOP, "name"))?;
    result.product_code = json_string(offer, "id").ok_or_else(|| CrawlError::missing(SHOP, "id"))?;

    let price = json_f64(offer, "price").ok_or_else(|| CrawlError::missing(SHOP, "price"))?;
    match json_string(offer, "dimension20") {
        Some(sticker) => match parse_promotion(&sticker, price) {
            Some(discount) => {
                debug!(%sticker, discount, "promotion applied");
                result.discount_price = discount;
            }
            None => {
                info!(%sticker, "could not parse promotion, assuming no discount");
                result.normal_price = price;
            }
        },
        None => result.normal_price = price,
    }

    Ok(result)
}

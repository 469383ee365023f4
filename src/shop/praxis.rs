//! Praxis (praxis.nl) via the preloaded Redux state on the product page.
//!
//! The state is assigned to a global in an inline script and is not always
//! valid JSON: stray backslashes before ordinary characters show up and have
//! to be dropped before parsing.

use async_trait::async_trait;
use scraper::Html;
use serde_json::Value;

use super::page::{all, json_f64, json_string, optional, parse_ean};
use super::Extractor;
use crate::error::{CrawlError, Result};
use crate::http_client::{fetch_page, PageFetcher, StatusPolicy};
use crate::result::CrawlResult;

const SHOP: &str = "praxis";
const STATE_GLOBAL: &str = "window.__PRELOADED_STATE_productDetailsFragmentInfo__";
const EXCLUDED_DISCOUNT: &str = "excludedproducts";

pub struct PraxisExtractor;

#[async_trait]
impl Extractor for PraxisExtractor {
    fn name(&self) -> &'static str {
        SHOP
    }

    async fn extract(&self, url: &str, fetcher: &dyn PageFetcher) -> Result<CrawlResult> {
        let html = fetch_page(fetcher, SHOP, url, url, &[], StatusPolicy::RequireOk).await?;
        parse_page(&html)
    }
}

pub(crate) fn parse_page(html: &str) -> Result<CrawlResult> {
    let raw = {
        let doc = Html::parse_document(html);
        all(&doc, "script")
            .into_iter()
            .map(|script| script.text().collect::<String>())
            .find(|source| source.trim_start().starts_with(STATE_GLOBAL))
            .ok_or_else(|| CrawlError::missing(SHOP, STATE_GLOBAL))?
    };
    let state = raw
        .split_once('=')
        .map(|(_, json)| json.trim().trim_end_matches(';'))
        .ok_or_else(|| CrawlError::extraction(SHOP, "preloaded state has no assignment"))?;

    let data: Value =
        serde_json::from_str(&repair_escapes(state)).map_err(|e| CrawlError::json(SHOP, &e))?;
    let product = data
        .get("productDetails")
        .ok_or_else(|| CrawlError::missing(SHOP, "productDetails"))?;

    let path =
        json_string(&data, "productUrl").ok_or_else(|| CrawlError::missing(SHOP, "productUrl"))?;
    let mut result = CrawlResult::new(format!("https://www.praxis.nl{path}"));

    result.product_name =
        json_string(product, "name").ok_or_else(|| CrawlError::missing(SHOP, "name"))?;
    result.product_code = json_string(product, "code")
        .map(|code| code.trim_start_matches('0').to_string())
        .filter(|code| !code.is_empty())
        .ok_or_else(|| CrawlError::missing(SHOP, "code"))?;
    let ean = json_string(product, "ean").as_deref().and_then(parse_ean);
    result.ean = optional(SHOP, "ean", ean);

    let excluded = product
        .get("discountClass")
        .and_then(Value::as_str)
        .is_some_and(|class| class == EXCLUDED_DISCOUNT);
    let discount = match product.get("discount") {
        Some(discount) if !excluded => Some(
            json_f64(discount, "value").ok_or_else(|| CrawlError::missing(SHOP, "discount.value"))?,
        ),
        _ => None,
    };
    match discount {
        Some(price) if price > 0.0 => {
            result.discount_price = price;
            result.on_sale = true;
        }
        _ => {
            let price = product
                .get("price")
                .and_then(|price| json_f64(price, "value"))
                .ok_or_else(|| CrawlError::missing(SHOP, "price.value"))?;
            result.normal_price = price;
        }
    }

    Ok(result)
}

/// Drop every backslash that does not start a valid JSON escape.
fn repair_escapes(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => {
                out.push(c);
                out.extend(chars.next());
            }
            Some('u') if is_unicode_escape(chars.clone().skip(1)) => out.push(c),
            _ => {}
        }
    }

    out
}

fn is_unicode_escape(mut rest: impl Iterator<Item = char>) -> bool {
    (0..4).all(|_| rest.next().is_some_and(|c| c.is_ascii_hexdigit()))
}

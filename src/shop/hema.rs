//! HEMA (hema.nl) via the analytics object embedded as a JS string literal.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use serde_json::Value;
use tracing::{debug, warn};

use super::page::{all, json_f64, json_string};
use super::Extractor;
use crate::error::{CrawlError, Result};
use crate::http_client::{fetch_page, PageFetcher, StatusPolicy};
use crate::result::{CrawlResult, PRICE_UNKNOWN};

const SHOP: &str = "hema";

static GTM_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"var gtmDataObj = JSON\.parse\('(.+)'\);").expect("gtm data regex")
});

pub struct HemaExtractor;

#[async_trait]
impl Extractor for HemaExtractor {
    fn name(&self) -> &'static str {
        SHOP
    }

    async fn extract(&self, url: &str, fetcher: &dyn PageFetcher) -> Result<CrawlResult> {
        let html = fetch_page(fetcher, SHOP, url, url, &[], StatusPolicy::RequireOk).await?;
        parse_page(url, &html)
    }
}

pub(crate) fn parse_page(url: &str, html: &str) -> Result<CrawlResult> {
    let literal = {
        let doc = Html::parse_document(html);
        all(&doc, "script")
            .into_iter()
            .find_map(|script| {
                let source = script.text().collect::<String>();
                GTM_DATA
                    .captures(&source)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
            })
            .ok_or_else(|| CrawlError::missing(SHOP, "gtmDataObj"))?
    };

    let raw = unescape_js(&literal);
    debug!(len = raw.len(), "found embedded product json");
    let data: Value = serde_json::from_str(&raw).map_err(|e| CrawlError::json(SHOP, &e))?;
    let product = data
        .pointer("/ecommerce/detail/products/0")
        .ok_or_else(|| CrawlError::missing(SHOP, "ecommerce.detail.products"))?;

    let mut result = CrawlResult::new(url);
    result.product_name =
        json_string(product, "name").ok_or_else(|| CrawlError::missing(SHOP, "name"))?;
    result.product_code =
        json_string(product, "id").ok_or_else(|| CrawlError::missing(SHOP, "id"))?;
    result.normal_price = json_f64(product, "price").unwrap_or_else(|| {
        warn!(url, "no price in product data");
        PRICE_UNKNOWN
    });

    Ok(result)
}

/// Decode the escapes of a single-quoted JS string literal body.
/// Unknown escapes keep the escaped character.
fn unescape_js(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('0') => out.push('\0'),
            Some('x') => push_code(&mut out, &mut chars, 2, 'x'),
            Some('u') => push_code(&mut out, &mut chars, 4, 'u'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

fn push_code(out: &mut String, chars: &mut std::str::Chars<'_>, digits: usize, marker: char) {
    let hex: String = chars.by_ref().take(digits).collect();
    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
        Some(decoded) if hex.len() == digits => out.push(decoded),
        _ => {
            out.push('\\');
            out.push(marker);
            out.push_str(&hex);
        }
    }
}

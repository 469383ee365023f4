//! Ekoplaza (ekoplaza.nl) via the product-by-url API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::page::{optional, parse_ean};
use super::Extractor;
use crate::error::{CrawlError, Result};
use crate::http_client::{fetch_page, PageFetcher, StatusPolicy};
use crate::result::CrawlResult;

const SHOP: &str = "ekoplaza";

pub struct EkoplazaExtractor;

#[async_trait]
impl Extractor for EkoplazaExtractor {
    fn name(&self) -> &'static str {
        SHOP
    }

    async fn extract(&self, url: &str, fetcher: &dyn PageFetcher) -> Result<CrawlResult> {
        let body =
            fetch_page(fetcher, SHOP, url, &api_url(url), &[], StatusPolicy::RequireOk).await?;
        parse_api(url, &body)
    }
}

/// API location for a product page: everything after the last `product/`.
pub fn api_url(page_url: &str) -> String {
    let slug = page_url.rsplit("product/").next().unwrap_or(page_url);
    format!("https://www.ekoplaza.nl/api/aspos/products/url/{slug}")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiResponse {
    product: Option<ApiProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiProduct {
    description: Option<String>,
    default_scan_code: Option<ScanCode>,
    discount: Option<ApiDiscount>,
    price_incl_tax: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScanCode {
    code: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiDiscount {
    price_incl_tax: Option<Value>,
}

pub(crate) fn parse_api(url: &str, body: &str) -> Result<CrawlResult> {
    let response: ApiResponse =
        serde_json::from_str(body).map_err(|e| CrawlError::json(SHOP, &e))?;
    let product = response.product.ok_or_else(|| CrawlError::missing(SHOP, "Product"))?;

    let mut result = CrawlResult::new(url);
    result.product_name = product
        .description
        .as_deref()
        .map(title_case)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| CrawlError::missing(SHOP, "Description"))?;

    // Scan codes are EANs.
    let code = product
        .default_scan_code
        .and_then(|scan| scan.code)
        .as_ref()
        .and_then(scalar)
        .ok_or_else(|| CrawlError::missing(SHOP, "DefaultScanCode.Code"))?;
    result.ean = optional(SHOP, "ean", parse_ean(&code));
    result.product_code = code;

    let discount = product.discount.and_then(|d| d.price_incl_tax);
    if let Some(discount) = discount.as_ref().and_then(number) {
        result.discount_price = discount;
    }
    result.normal_price = product
        .price_incl_tax
        .as_ref()
        .and_then(number)
        .ok_or_else(|| CrawlError::missing(SHOP, "PriceInclTax"))?;

    Ok(result)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => super::page::parse_price(s),
        _ => None,
    }
}

/// "BIOLOGISCHE havermelk 1L" → "Biologische Havermelk 1L". Every run of
/// letters starts upper case and continues lower case.
fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_word = false;
    for c in raw.trim().chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

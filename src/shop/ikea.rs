//! IKEA (ikea.com) via the buy module markup.
//!
//! Prices are rendered as an integer part and a decimal part in separate
//! spans. A struck-through previous price means the current one is a sale.

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tracing::{debug, info};

use super::page::{first, first_in, meta, optional, text};
use super::Extractor;
use crate::error::{CrawlError, Result};
use crate::http_client::{fetch_page, PageFetcher, StatusPolicy};
use crate::result::CrawlResult;

const SHOP: &str = "ikea";

const BUY_MODULE: &str = r#"[id*="buy-module-content"]"#;
const PREVIOUS_PRICE: [&str; 2] = [
    r#"div[class*="price-package__previous-price-hasStrikeThrough"]"#,
    r#"div[class*="price-module__addon"]"#,
];
const CURRENT_PRICE: &str = r#"[class*="price-module__current-price"]"#;

pub struct IkeaExtractor;

#[async_trait]
impl Extractor for IkeaExtractor {
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
    let module =
        first(&doc, BUY_MODULE).ok_or_else(|| CrawlError::missing(SHOP, "buy-module-content"))?;

    let canonical = meta(&doc, "og:url").unwrap_or_else(|| {
        info!(url, "no canonical url, keeping request url");
        url.to_string()
    });
    let mut result = CrawlResult::new(canonical);

    result.product_name = first_in(module, r#"span[class*="header-section__title--big"]"#)
        .or_else(|| first_in(module, r#"div[class*="header-section__title--big"]"#))
        .and_then(text)
        .ok_or_else(|| CrawlError::missing(SHOP, "header-section__title--big"))?;
    let description =
        first_in(module, r#"span[class*="header-section__description-text"]"#).and_then(text);
    result.product_description = optional(SHOP, "description", description);
    result.product_code = first(&doc, r#"span[class*="product-identifier__value"]"#)
        .and_then(text)
        .ok_or_else(|| CrawlError::missing(SHOP, "product-identifier__value"))?;

    if let Some(previous) = PREVIOUS_PRICE
        .iter()
        .find_map(|css| first_in(module, css))
        .and_then(price_in)
    {
        result.normal_price = previous;
    } else {
        debug!("no previous price");
    }

    let current = first_in(module, CURRENT_PRICE)
        .and_then(price_in)
        .ok_or_else(|| CrawlError::missing(SHOP, "price-module__current-price"))?;
    if result.normal_price > 0.0 && current > 0.0 {
        result.discount_price = current;
        result.on_sale = true;
    } else if result.normal_price <= 0.0 {
        result.normal_price = current;
    }

    Ok(result)
}

/// "1.299,-" + ",95" → 1299.95. Separators and the trailing dash are
/// ignored; a missing decimal part counts as zero.
fn price_in(tag: ElementRef<'_>) -> Option<f64> {
    let integer: String = first_in(tag, r#"span[class*="price__integer"]"#)
        .and_then(text)?
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let decimals: String = first_in(tag, r#"span[class*="price__decimal"]"#)
        .and_then(text)
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    if integer.is_empty() {
        return None;
    }
    let decimals = if decimals.is_empty() { "0" } else { &decimals };
    format!("{integer}.{decimals}").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.ikea.com/nl/nl/p/billy-boekenkast-wit-00263850/";

    fn price(integer: &str, decimal: &str) -> String {
        format!(
            r#"<span class="price__integer">{integer}</span><span class="price__decimal">{decimal}</span>"#
        )
    }

    fn page(prices: &str) -> String {
        format!(
            r#"<html><head><meta property="og:url" content="https://www.ikea.com/nl/nl/p/billy-00263850/"></head>
            <body><div id="pip-buy-module-content">
              <h1><span class="pip-header-section__title--big">BILLY</span>
              <span class="pip-header-section__description-text">Boekenkast, wit</span></h1>
              {prices}
            </div>
            <span class="pip-product-identifier__value">002.638.50</span></body></html>"#
        )
    }

    #[test]
    fn regular_price() {
        let html = page(&format!(
            r#"<div class="pip-price-module__current-price">{}</div>"#,
            price("59", ",-")
        ));
        let r = parse_page(URL, &html).unwrap();
        assert_eq!(r.url, "https://www.ikea.com/nl/nl/p/billy-00263850/");
        assert_eq!(r.product_name, "BILLY");
        assert_eq!(r.product_description.as_deref(), Some("Boekenkast, wit"));
        assert_eq!(r.product_code, "002.638.50");
        assert_eq!(r.normal_price, 59.0);
        assert!(!r.on_sale);
    }

    #[test]
    fn struck_through_price_means_sale() {
        let html = page(&format!(
            r#"<div class="pip-price-package__previous-price-hasStrikeThrough">{}</div>
               <div class="pip-price-module__current-price">{}</div>"#,
            price("1.299", ",-"),
            price("999", ",95")
        ));
        let r = parse_page(URL, &html).unwrap();
        assert_eq!(r.normal_price, 1299.0);
        assert_eq!(r.discount_price, 999.95);
        assert!(r.on_sale);
    }

    #[test]
    fn zero_current_price_keeps_previous_as_normal() {
        let html = page(&format!(
            r#"<div class="pip-price-package__previous-price-hasStrikeThrough">{}</div>
               <div class="pip-price-module__current-price">{}</div>"#,
            price("49", ",-"),
            price("0", ",-")
        ));
        let r = parse_page(URL, &html).unwrap();
        assert!(!r.on_sale);
        assert_eq!(r.normal_price, 49.0);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn description_is_optional() {
        let html = page(&format!(
            r#"<div class="pip-price-module__current-price">{}</div>"#,
            price("59", ",-")
        ))
        .replace(r#"<span class="pip-header-section__description-text">Boekenkast, wit</span>"#, "");
        assert_eq!(parse_page(URL, &html).unwrap().product_description, None);
    }

    #[test]
    fn missing_current_price_fails() {
        let err = parse_page(URL, &page("")).unwrap_err();
        assert!(err.to_string().contains("current-price"));
    }

    #[test]
    fn non_product_page_fails() {
        let err = parse_page(URL, "<html><body>Zoeken</body></html>").unwrap_err();
        assert!(err.is_extraction_failure());
    }
}

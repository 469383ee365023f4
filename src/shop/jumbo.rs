//! Jumbo (jumbo.com) via the server-rendered JSON-LD product block.
//!
//! Jumbo rejects clients that don't look like a browser, so requests carry a
//! fixed desktop Firefox header set. Only a 404 means the product is gone;
//! other statuses still come with a renderable page.

use async_trait::async_trait;
use scraper::Html;
use serde_json::Value;

use super::page::{json_f64, json_string, jsonld_objects, optional, parse_ean, type_matches};
use super::Extractor;
use crate::error::{CrawlError, Result};
use crate::http_client::{fetch_page, Headers, PageFetcher, StatusPolicy};
use crate::result::CrawlResult;

const SHOP: &str = "jumbo";

const SSR_JSONLD: &str = r#"script[type="application/ld+json"][data-n-head="ssr"]"#;
const ANY_JSONLD: &str = r#"script[type="application/ld+json"]"#;

const BROWSER_HEADERS: Headers = &[
    ("Referer", "https://www.jumbo.com"),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Accept-Language", "nl,en-US;q=0.7,en;q=0.3"),
    ("Cache-Control", "no-cache"),
    ("Connection", "keep-alive"),
    ("DNT", "1"),
    ("Pragma", "no-cache"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
    ("Upgrade-Insecure-Requests", "1"),
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:96.0) Gecko/20100101 Firefox/96.0",
    ),
];

pub struct JumboExtractor;

#[async_trait]
impl Extractor for JumboExtractor {
    fn name(&self) -> &'static str {
        SHOP
    }

    async fn extract(&self, url: &str, fetcher: &dyn PageFetcher) -> Result<CrawlResult> {
        let html =
            fetch_page(fetcher, SHOP, url, url, BROWSER_HEADERS, StatusPolicy::NotFoundOnly)
                .await?;
        parse_page(url, &html)
    }
}

pub(crate) fn parse_page(url: &str, html: &str) -> Result<CrawlResult> {
    let doc = Html::parse_document(html);
    let product = jsonld_objects(&doc, SSR_JSONLD, "Product")
        .into_iter()
        .next()
        .or_else(|| jsonld_objects(&doc, ANY_JSONLD, "Product").into_iter().next())
        .ok_or_else(|| CrawlError::missing(SHOP, "Product JSON-LD"))?;

    from_product(url, &product)
}

fn from_product(url: &str, product: &Value) -> Result<CrawlResult> {
    let offers = product
        .get("offers")
        .ok_or_else(|| CrawlError::missing(SHOP, "offers"))?;
    if !offers.get("@type").is_some_and(|t| type_matches(t, "AggregateOffer")) {
        return Err(CrawlError::extraction(SHOP, "offers is not an AggregateOffer"));
    }

    let canonical = json_string(product, "url").unwrap_or_else(|| url.to_string());
    let mut result = CrawlResult::new(canonical);
    result.product_name =
        json_string(product, "name").ok_or_else(|| CrawlError::missing(SHOP, "name"))?;
    let ean = json_string(product, "gtin13").as_deref().and_then(parse_ean);
    result.ean = optional(SHOP, "gtin13", ean);
    result.product_code =
        json_string(product, "sku").ok_or_else(|| CrawlError::missing(SHOP, "sku"))?;

    if let Some(low) = json_f64(offers, "lowPrice") {
        result.discount_price = low;
    }
    result.normal_price =
        json_f64(offers, "highPrice").ok_or_else(|| CrawlError::missing(SHOP, "offers.highPrice"))?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{FetchResponse, StaticFetcher};

    const URL: &str = "https://www.jumbo.com/producten/jumbo-hagelslag-puur-400g-123456PAK";

    fn page(offers: &str) -> String {
        format!(
            r#"<html><head>
            <script type="application/ld+json" data-n-head="ssr">
            {{"@context":"https://schema.org","@type":"Product","name":"Jumbo Hagelslag Puur 400g",
              "sku":"123456PAK","gtin13":"8718452000000",
              "url":"https://www.jumbo.com/producten/jumbo-hagelslag-puur-400g-123456PAK",
              "offers":{offers}}}
            </script></head><body></body></html>"#
        )
    }

    #[test]
    fn aggregate_offer_yields_both_prices() {
        let offers = r#"{"@type":"AggregateOffer","lowPrice":3,"highPrice":5}"#;
        let r = parse_page(URL, &page(offers)).unwrap();
        assert_eq!(r.product_name, "Jumbo Hagelslag Puur 400g");
        assert_eq!(r.product_code, "123456PAK");
        assert_eq!(r.ean, Some(8_718_452_000_000));
        assert_eq!(r.discount_price, 3.0);
        assert_eq!(r.normal_price, 5.0);
    }

    #[test]
    fn low_price_is_optional() {
        let r = parse_page(URL, &page(r#"{"@type":"AggregateOffer","highPrice":"2.49"}"#)).unwrap();
        assert_eq!(r.normal_price, 2.49);
        assert_eq!(r.discount_price, crate::PRICE_UNKNOWN);
    }

    #[test]
    fn gtin_is_optional() {
        let html = page(r#"{"@type":"AggregateOffer","highPrice":1}"#)
            .replace(r#""gtin13":"8718452000000","#, "");
        assert_eq!(parse_page(URL, &html).unwrap().ean, None);
    }

    #[test]
    fn other_offer_types_are_rejected() {
        let err = parse_page(URL, &page(r#"{"@type":"Offer","price":2}"#)).unwrap_err();
        assert!(err.to_string().contains("AggregateOffer"));
    }

    #[test]
    fn missing_sku_fails() {
        let html = page(r#"{"@type":"AggregateOffer","highPrice":1}"#)
            .replace(r#""sku":"123456PAK","#, "");
        let err = parse_page(URL, &html).unwrap_err();
        assert!(err.to_string().contains("sku"));
    }

    #[test]
    fn page_without_product_fails() {
        let err = parse_page(URL, "<html><body>Access denied</body></html>").unwrap_err();
        assert!(err.is_extraction_failure());
    }

    #[tokio::test]
    async fn forbidden_page_is_still_parsed() {
        let fetcher = StaticFetcher::new().with(
            URL,
            FetchResponse {
                status: 403,
                body: page(r#"{"@type":"AggregateOffer","highPrice":1.99}"#),
            },
        );
        let r = JumboExtractor.extract(URL, &fetcher).await.unwrap();
        assert_eq!(r.normal_price, 1.99);
    }

    #[tokio::test]
    async fn missing_page_is_not_found() {
        let err = JumboExtractor.extract(URL, &StaticFetcher::new()).await.unwrap_err();
        assert!(matches!(err, CrawlError::PageNotFound { .. }));
    }
}

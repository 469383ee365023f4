//! Albert Heijn (ah.nl) via the webshop product API.
//!
//! Product pages carry a `wi<id>` segment; the id is looked up through the
//! search API, whose `price.now` already reflects a running bonus. A bonus
//! counts only while today falls inside its start/end dates.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::page::{optional, parse_ean};
use super::Extractor;
use crate::error::{CrawlError, Result};
use crate::http_client::{fetch_page, PageFetcher, StatusPolicy};
use crate::promotion::parse_promotion;
use crate::result::CrawlResult;

const SHOP: &str = "ah";

static WEBSHOP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/wi(\d+)(?:/|$)").expect("webshop id regex"));

pub struct AlbertHeijnExtractor;

#[async_trait]
impl Extractor for AlbertHeijnExtractor {
    fn name(&self) -> &'static str {
        SHOP
    }

    async fn extract(&self, url: &str, fetcher: &dyn PageFetcher) -> Result<CrawlResult> {
        let id = webshop_id(url).ok_or_else(|| {
            warn!(url, "no webshop id in product url");
            CrawlError::not_found(url)
        })?;

        let body =
            fetch_page(fetcher, SHOP, url, &api_url(&id), &[], StatusPolicy::RequireOk).await?;
        parse_api(url, &body, Local::now().date_naive())
    }
}

/// `https://www.ah.nl/producten/product/wi395004/x` → "395004".
pub fn webshop_id(url: &str) -> Option<String> {
    WEBSHOP_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn api_url(webshop_id: &str) -> String {
    format!("https://www.ah.nl/zoeken/api/products/product?webshopId={webshop_id}")
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    card: Option<Card>,
}

#[derive(Debug, Deserialize)]
struct Card {
    #[serde(default)]
    products: Vec<ApiProduct>,
}

#[derive(Debug, Deserialize)]
struct ApiProduct {
    id: Option<Value>,
    title: Option<String>,
    #[serde(default)]
    gtins: Vec<Value>,
    price: Option<ApiPrice>,
    discount: Option<ApiDiscount>,
    shield: Option<Shield>,
}

#[derive(Debug, Deserialize)]
struct ApiPrice {
    now: Option<f64>,
    was: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDiscount {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Shield {
    text: Option<String>,
}

/// Inclusive date range a bonus applies to. Open ends mean "always
/// started" / "never ends".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ValidityWindow {
    /// Dates are read from their `YYYY-MM-DD` prefix; unreadable dates are
    /// treated as open ends.
    fn from_api(discount: &ApiDiscount) -> Self {
        Self {
            start: discount.start_date.as_deref().and_then(parse_date),
            end: discount.end_date.as_deref().and_then(parse_date),
        }
    }

    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start.is_none_or(|start| start <= day) && self.end.is_none_or(|end| day <= end)
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            debug!(raw, error = %e, "ignoring unreadable bonus date");
            None
        }
    }
}

/// Build a result from the product API response as seen on `today`.
pub(crate) fn parse_api(url: &str, body: &str, today: NaiveDate) -> Result<CrawlResult> {
    let response: ApiResponse = serde_json::from_str(body).map_err(|e| CrawlError::json(SHOP, &e))?;
    let product = response
        .card
        .and_then(|card| card.products.into_iter().next())
        .ok_or_else(|| CrawlError::missing(SHOP, "card.products"))?;

    let mut result = CrawlResult::new(url);
    result.product_name = product
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| CrawlError::missing(SHOP, "title"))?;
    let ean = product.gtins.first().and_then(|gtin| match gtin {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_ean(s),
        _ => None,
    });
    result.ean = optional(SHOP, "ean", ean);
    result.product_code = match product.id {
        Some(Value::Number(n)) => format!("wi{n}"),
        Some(Value::String(s)) if !s.is_empty() => format!("wi{s}"),
        _ => return Err(CrawlError::missing(SHOP, "id")),
    };

    let price = product.price.ok_or_else(|| CrawlError::missing(SHOP, "price"))?;
    let now = price.now.ok_or_else(|| CrawlError::missing(SHOP, "price.now"))?;

    let Some(discount) = product.discount else {
        result.normal_price = now;
        return Ok(result);
    };

    let running = ValidityWindow::from_api(&discount).contains(today);
    let label = product.shield.and_then(|s| s.text);
    let bonus = shield_price(label.as_deref(), now);
    if running && bonus > 0.0 {
        result.discount_price = bonus;
        result.on_sale = true;
    } else {
        if running {
            debug!(url, bonus, "bonus price is not positive, reading it as a regular price");
        }
        result.normal_price = price.was.unwrap_or_else(|| {
            warn!(url, "no running bonus and no previous price given, using current price");
            now
        });
    }

    Ok(result)
}

/// Multi-buy shields ("2e halve prijs") change the per-unit price; plain
/// percentage shields are already reflected in `now`.
fn shield_price(label: Option<&str>, now: f64) -> f64 {
    label
        .filter(|l| !l.to_lowercase().contains("korting"))
        .and_then(|l| parse_promotion(l, now))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::StaticFetcher;

    const URL: &str = "https://www.ah.nl/producten/product/wi395004/ah-hagelslag-puur";

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn body(extra: &str) -> String {
        format!(
            r#"{{"card":{{"products":[{{"id":395004,"title":"AH Hagelslag puur","gtins":["8718907000000"],{extra}}}]}}}}"#
        )
    }

    #[test]
    fn extracts_webshop_id() {
        assert_eq!(webshop_id(URL).as_deref(), Some("395004"));
        assert_eq!(webshop_id("https://www.ah.nl/producten/product/wi12").as_deref(), Some("12"));
        assert_eq!(webshop_id("https://www.ah.nl/bonus"), None);
    }

    #[test]
    fn plain_price_is_normal_price() {
        let r = parse_api(URL, &body(r#""price":{"now":2.19}"#), day(2024, 3, 1)).unwrap();
        assert_eq!(r.product_name, "AH Hagelslag puur");
        assert_eq!(r.product_code, "wi395004");
        assert_eq!(r.ean, Some(8_718_907_000_000));
        assert_eq!(r.normal_price, 2.19);
        assert!(!r.on_sale);
    }

    #[test]
    fn bonus_inside_window_is_a_discount() {
        let json = body(
            r#""price":{"now":10.0,"was":12.0},"discount":{"startDate":"2024-03-01","endDate":"2024-03-07"}"#,
        );
        for today in [day(2024, 3, 1), day(2024, 3, 4), day(2024, 3, 7)] {
            let r = parse_api(URL, &json, today).unwrap();
            assert!(r.on_sale);
            assert_eq!(r.discount_price, 10.0);
            assert_eq!(r.normal_price, crate::PRICE_UNKNOWN);
        }
    }

    #[test]
    fn expired_bonus_falls_back_to_previous_price() {
        let json = body(
            r#""price":{"now":10.0,"was":12.0},"discount":{"startDate":"2024-03-01","endDate":"2024-03-07"}"#,
        );
        let r = parse_api(URL, &json, day(2024, 3, 8)).unwrap();
        assert!(!r.on_sale);
        assert_eq!(r.normal_price, 12.0);

        let json = body(
            r#""price":{"now":10.0},"discount":{"startDate":"2024-03-01","endDate":"2024-03-07"}"#,
        );
        let r = parse_api(URL, &json, day(2024, 2, 28)).unwrap();
        assert_eq!(r.normal_price, 10.0);
    }

    #[test]
    fn missing_or_bad_dates_are_open_ended() {
        let json = body(r#""price":{"now":3.0},"discount":{"endDate":"garbage"}"#);
        let r = parse_api(URL, &json, day(2030, 1, 1)).unwrap();
        assert!(r.on_sale);

        let json = body(r#""price":{"now":3.0},"discount":{"startDate":"2024-03-01T00:00:00"}"#);
        assert!(parse_api(URL, &json, day(2024, 3, 1)).unwrap().on_sale);
        assert!(!parse_api(URL, &json, day(2024, 2, 29)).unwrap().on_sale);
    }

    #[test]
    fn multi_buy_shield_adjusts_discount() {
        let json = body(r#""price":{"now":4.0},"discount":{},"shield":{"text":"1+1 gratis"}"#);
        let r = parse_api(URL, &json, day(2024, 1, 1)).unwrap();
        assert_eq!(r.discount_price, 2.0);

        let json = body(r#""price":{"now":4.0},"discount":{},"shield":{"text":"25% korting"}"#);
        assert_eq!(parse_api(URL, &json, day(2024, 1, 1)).unwrap().discount_price, 4.0);
    }

    #[test]
    fn non_positive_bonus_is_not_a_sale() {
        let json = body(r#""price":{"now":0.0,"was":1.0},"discount":{}"#);
        let r = parse_api(URL, &json, day(2024, 1, 1)).unwrap();
        assert!(!r.on_sale);
        assert_eq!(r.normal_price, 1.0);
        assert!(r.validate().is_ok());

        let json = body(r#""price":{"now":4.0},"discount":{},"shield":{"text":"2 voor 0"}"#);
        let r = parse_api(URL, &json, day(2024, 1, 1)).unwrap();
        assert!(!r.on_sale);
        assert_eq!(r.normal_price, 4.0);
        assert_eq!(r.discount_price, crate::PRICE_UNKNOWN);
    }

    #[test]
    fn gtins_are_optional() {
        let json = r#"{"card":{"products":[{"id":1,"title":"AH Appels","price":{"now":2.0}}]}}"#;
        assert_eq!(parse_api(URL, json, day(2024, 1, 1)).unwrap().ean, None);
    }

    #[test]
    fn missing_fields_fail() {
        let err = parse_api(URL, r#"{"card":{"products":[]}}"#, day(2024, 1, 1)).unwrap_err();
        assert!(err.to_string().contains("card.products"));

        let err = parse_api(URL, &body(r#""price":{}"#), day(2024, 1, 1)).unwrap_err();
        assert!(err.to_string().contains("price.now"));

        assert!(parse_api(URL, "<html>", day(2024, 1, 1)).unwrap_err().is_extraction_failure());
    }

    #[tokio::test]
    async fn url_without_id_is_not_found_and_not_fetched() {
        let fetcher = StaticFetcher::new();
        let err = AlbertHeijnExtractor
            .extract("https://www.ah.nl/bonus", &fetcher)
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::PageNotFound { .. }));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn fetches_the_api_url() {
        let fetcher =
            StaticFetcher::new().with_page(api_url("395004"), body(r#""price":{"now":1.5}"#));
        let r = AlbertHeijnExtractor.extract(URL, &fetcher).await.unwrap();
        assert_eq!(r.url, URL);
        assert_eq!(r.normal_price, 1.5);
        assert_eq!(fetcher.requests(), vec![api_url("395004")]);
    }
}

//! Price observations per offer and the aggregates derived from them.
//!
//! This is the persistence boundary: a validated [`CrawlResult`] becomes a
//! timestamped [`PricePoint`], appended to its [`Offer`]. How offers are
//! stored is up to the caller; the CLI keeps them in a JSON file.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::result::CrawlResult;

/// One observed price of an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub normal_price: f64,
    pub discount_price: f64,
    pub on_sale: bool,
    pub observed_at: DateTime<Utc>,
}

impl PricePoint {
    #[must_use]
    pub fn from_result(result: &CrawlResult, observed_at: DateTime<Utc>) -> Self {
        Self {
            normal_price: result.normal_price,
            discount_price: result.discount_price,
            on_sale: result.on_sale,
            observed_at,
        }
    }

    /// Discount price when on sale, normal price otherwise; `None` when that
    /// field is negative.
    #[must_use]
    pub fn effective_price(&self) -> Option<f64> {
        let price = if self.on_sale {
            self.discount_price
        } else {
            self.normal_price
        };
        (price >= 0.0).then_some(price)
    }
}

/// Aggregates over the effective prices of an offer.
///
/// Observations without an effective price are skipped entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferStats {
    pub count: usize,
    pub average: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// Sample standard deviation; 0 with fewer than two prices.
    pub std_dev: f64,
}

impl OfferStats {
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a PricePoint>) -> Self {
        let prices: Vec<f64> = points.into_iter().filter_map(PricePoint::effective_price).collect();
        let count = prices.len();

        if count == 0 {
            return Self {
                count,
                average: None,
                minimum: None,
                maximum: None,
                std_dev: 0.0,
            };
        }

        let average = prices.iter().sum::<f64>() / count as f64;
        let minimum = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let maximum = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let std_dev = if count < 2 {
            0.0
        } else {
            let variance =
                prices.iter().map(|p| (p - average).powi(2)).sum::<f64>() / (count - 1) as f64;
            variance.sqrt()
        };

        Self {
            count,
            average: Some(average),
            minimum: Some(minimum),
            maximum: Some(maximum),
            std_dev,
        }
    }
}

/// Whether an offer last observed at `last_observed` is due for a crawl at
/// `now`. Offers are crawled at most once per calendar day of `now`'s time
/// zone; never-observed offers are always due.
pub fn should_crawl<Tz: TimeZone>(
    last_observed: Option<&DateTime<Tz>>,
    now: &DateTime<Tz>,
) -> bool {
    last_observed.is_none_or(|last| last.date_naive() < now.date_naive())
}

/// A tracked product page and its price history, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    #[serde(default)]
    pub prices: Vec<PricePoint>,
}

impl Offer {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            product_name: None,
            product_code: None,
            prices: Vec::new(),
        }
    }

    /// Most recent observation.
    pub fn current_price(&self) -> Option<&PricePoint> {
        self.prices.iter().max_by_key(|p| p.observed_at)
    }

    pub fn last_observed(&self) -> Option<DateTime<Utc>> {
        self.current_price().map(|p| p.observed_at)
    }

    /// Record a crawl. Product identity is taken from the latest result.
    pub fn record(&mut self, result: &CrawlResult, observed_at: DateTime<Utc>) {
        self.product_name = Some(result.product_name.clone());
        self.product_code = Some(result.product_code.clone());
        self.prices.push(PricePoint::from_result(result, observed_at));
    }

    /// Aggregates over observations made at or after `since`.
    #[must_use]
    pub fn stats_since(&self, since: DateTime<Utc>) -> OfferStats {
        OfferStats::from_points(self.prices.iter().filter(|p| p.observed_at >= since))
    }

    #[must_use]
    pub fn stats(&self) -> OfferStats {
        OfferStats::from_points(&self.prices)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset};

    use super::*;
    use crate::PRICE_UNKNOWN;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn point(normal: f64, discount: f64, on_sale: bool) -> PricePoint {
        PricePoint {
            normal_price: normal,
            discount_price: discount,
            on_sale,
            observed_at: at(1, 12),
        }
    }

    #[test]
    fn effective_price_rule() {
        assert_eq!(point(5.0, 3.0, true).effective_price(), Some(3.0));
        assert_eq!(point(5.0, 3.0, false).effective_price(), Some(5.0));
        assert_eq!(point(PRICE_UNKNOWN, 3.0, false).effective_price(), None);
        assert_eq!(point(5.0, PRICE_UNKNOWN, true).effective_price(), None);
    }

    #[test]
    fn stats_skip_undefined_prices() {
        let points = [
            point(2.0, PRICE_UNKNOWN, false),
            point(PRICE_UNKNOWN, PRICE_UNKNOWN, false),
            point(9.0, 4.0, true),
            point(6.0, PRICE_UNKNOWN, false),
        ];
        let stats = OfferStats::from_points(&points);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.average, Some(4.0));
        assert_eq!(stats.minimum, Some(2.0));
        assert_eq!(stats.maximum, Some(6.0));
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
    }

    #[test]
    fn stats_of_single_and_empty_histories() {
        let one = OfferStats::from_points(&[point(3.0, PRICE_UNKNOWN, false)]);
        assert_eq!(one.average, Some(3.0));
        assert_eq!(one.std_dev, 0.0);

        let none = OfferStats::from_points(&[]);
        assert_eq!(none.count, 0);
        assert_eq!(none.average, None);
        assert_eq!(none.minimum, None);
    }

    #[test]
    fn crawl_at_most_once_per_day() {
        assert!(should_crawl::<Utc>(None, &at(2, 0)));
        assert!(!should_crawl(Some(&at(2, 1)), &at(2, 23)));
        assert!(should_crawl(Some(&at(1, 23)), &at(2, 0)));
        assert!(!should_crawl(Some(&at(3, 0)), &at(2, 12)));
    }

    #[test]
    fn day_boundary_follows_the_time_zone() {
        let amsterdam = FixedOffset::east_opt(2 * 3600).unwrap();
        let last = at(1, 21).with_timezone(&amsterdam);
        let now = at(1, 23).with_timezone(&amsterdam);
        assert!(should_crawl(Some(&last), &now));
        assert!(!should_crawl(Some(&at(1, 21)), &at(1, 23)));
    }

    #[test]
    fn offer_records_results() {
        let mut offer = Offer::new("https://www.ah.nl/producten/product/wi1/x");
        assert!(offer.last_observed().is_none());

        let mut result = CrawlResult::new(offer.url.clone());
        result.product_name = "Melk".to_string();
        result.product_code = "wi1".to_string();
        result.normal_price = 1.0;
        offer.record(&result, at(1, 9));
        result.normal_price = 2.0;
        offer.record(&result, at(3, 9));

        assert_eq!(offer.product_code.as_deref(), Some("wi1"));
        assert_eq!(offer.last_observed(), Some(at(3, 9)));
        assert_eq!(offer.current_price().and_then(PricePoint::effective_price), Some(2.0));
        assert_eq!(offer.stats().average, Some(1.5));
        assert_eq!(offer.stats_since(at(2, 0)).count, 1);
        assert_eq!(offer.stats_since(at(1, 9) - Duration::hours(1)).count, 2);
    }

    #[test]
    fn offer_file_format() {
        let json = r#"[{"url":"https://www.jumbo.com/p/1"},
            {"url":"https://www.hema.nl/p/2","prices":[{"normalPrice":4.5,"discountPrice":-1.0,"onSale":false,"observedAt":"2024-05-01T12:00:00Z"}]}]"#;
        let offers: Vec<Offer> = serde_json::from_str(json).unwrap();
        assert!(offers[0].prices.is_empty());
        assert_eq!(offers[1].last_observed(), Some(at(1, 12)));
    }
}

//! The normalized crawl result and its invariants.

use serde::{Deserialize, Serialize};

use crate::error::{CrawlError, InvalidResult};

/// Marks a price as unknown or not applicable. Distinct from a real
/// zero-cost offer.
pub const PRICE_UNKNOWN: f64 = -1.0;

/// Uniform record every extractor produces for one product page.
///
/// Exactly one of `normal_price` / `discount_price` is meaningful once the
/// result has been validated: the discount price when `on_sale`, the normal
/// price otherwise. The other keeps [`PRICE_UNKNOWN`] unless the shop
/// reports both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub url: String,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_description: Option<String>,
    pub product_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ean: Option<u64>,
    #[serde(default = "unknown_price")]
    pub normal_price: f64,
    #[serde(default = "unknown_price")]
    pub discount_price: f64,
    #[serde(default)]
    pub on_sale: bool,
}

fn unknown_price() -> f64 {
    PRICE_UNKNOWN
}

impl CrawlResult {
    /// Empty result for `url`, to be filled in field by field.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            product_name: String::new(),
            product_description: None,
            product_code: String::new(),
            ean: None,
            normal_price: PRICE_UNKNOWN,
            discount_price: PRICE_UNKNOWN,
            on_sale: false,
        }
    }

    /// Check the invariants storage relies on.
    ///
    /// Identity fields are checked first (url, name, code in that order),
    /// then price / on-sale consistency. The first violation is returned.
    pub fn validate(&self) -> Result<(), InvalidResult> {
        if self.url.is_empty() {
            return Err(InvalidResult::MissingUrl);
        }
        if self.product_name.is_empty() {
            return Err(InvalidResult::MissingName);
        }
        if self.product_code.is_empty() {
            return Err(InvalidResult::MissingCode);
        }

        if self.on_sale && self.discount_price < 0.0 {
            return Err(InvalidResult::MissingDiscountPrice);
        }
        if !self.on_sale && self.normal_price < 0.0 {
            return Err(InvalidResult::MissingNormalPrice);
        }

        Ok(())
    }

    /// Discount price when on sale, normal price otherwise; `None` when the
    /// applicable field holds the sentinel.
    pub fn effective_price(&self) -> Option<f64> {
        let price = if self.on_sale {
            self.discount_price
        } else {
            self.normal_price
        };
        (price >= 0.0).then_some(price)
    }

    /// Serialize for the persistence boundary.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Reconstruct a stored result, rejecting records that violate the
    /// invariants.
    pub fn from_json(json: &str) -> Result<Self, CrawlError> {
        let result: Self =
            serde_json::from_str(json).map_err(|e| CrawlError::json("storage", &e))?;
        result.validate()?;
        Ok(result)
    }
}

impl std::fmt::Display for CrawlResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CrawlResult(product_name={}, product_code={}, price={}, discount={}, sale={}, ean={})",
            self.product_name,
            self.product_code,
            self.normal_price,
            self.discount_price,
            self.on_sale,
            self.ean.map_or_else(|| "-".to_string(), |e| e.to_string()),
        )
    }
}

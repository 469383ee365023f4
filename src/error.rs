//! Crawl error taxonomy.
//!
//! Every failure a crawl can produce is one of four kinds:
//!
//! - [`CrawlError::WebsiteNotImplemented`]: no enabled extractor for the host
//! - [`CrawlError::PageNotFound`]: the shop says the product is gone
//! - [`CrawlError::ExtractionFailed`]: the page was fetched but could not be read
//! - [`CrawlError::InvalidResult`]: an extractor produced an inconsistent record
//!
//! Extractors build these through the small constructors below so that the
//! shop name and the failing field end up in the message.

use thiserror::Error;

use crate::http_client::FetchError;

/// Invariant violation found by [`CrawlResult::validate`](crate::CrawlResult::validate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidResult {
    #[error("no url given for item")]
    MissingUrl,

    #[error("no product name given for item")]
    MissingName,

    #[error("no product code given for item")]
    MissingCode,

    #[error("no discount price given for item on sale")]
    MissingDiscountPrice,

    #[error("no normal price given for item not on sale")]
    MissingNormalPrice,
}

/// Errors returned by [`Crawler::crawl`](crate::Crawler::crawl) and by every extractor.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("website not implemented: {hostname} ({url})")]
    WebsiteNotImplemented { url: String, hostname: String },

    #[error("page not found: {url}")]
    PageNotFound { url: String },

    #[error("{shop}: extraction failed: {reason}")]
    ExtractionFailed { shop: &'static str, reason: String },

    #[error("invalid crawl result: {0}")]
    InvalidResult(#[from] InvalidResult),
}

impl CrawlError {
    pub(crate) fn not_implemented(url: &str, hostname: &str) -> Self {
        Self::WebsiteNotImplemented {
            url: url.to_string(),
            hostname: hostname.to_string(),
        }
    }

    pub(crate) fn not_found(url: &str) -> Self {
        Self::PageNotFound {
            url: url.to_string(),
        }
    }

    pub(crate) fn extraction(shop: &'static str, reason: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            shop,
            reason: reason.into(),
        }
    }

    /// Missing required field.
    pub(crate) fn missing(shop: &'static str, field: &str) -> Self {
        Self::extraction(shop, format!("missing required field `{field}`"))
    }

    /// Malformed embedded or API JSON.
    pub(crate) fn json(shop: &'static str, err: &serde_json::Error) -> Self {
        Self::extraction(shop, format!("could not decode JSON: {err}"))
    }

    /// Network-level failure (connect, TLS, timeout, body read).
    pub(crate) fn fetch(shop: &'static str, err: &FetchError) -> Self {
        Self::extraction(shop, format!("fetch failed: {err}"))
    }

    /// Whether this is an extraction-class failure (including invariant
    /// violations, which are extractor bugs surfacing as bad data).
    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            Self::ExtractionFailed { .. } | Self::InvalidResult(_)
        )
    }

    /// Message suitable for showing to whoever submitted the URL.
    pub fn user_message(&self) -> String {
        match self {
            Self::WebsiteNotImplemented { hostname, url } => {
                let shop = if hostname.is_empty() { url } else { hostname };
                format!("Sorry, {shop} is not a supported shop.")
            }
            Self::PageNotFound { url } => {
                format!("The product at {url} could not be found; it may no longer be available.")
            }
            Self::ExtractionFailed { .. } | Self::InvalidResult(_) => {
                "Could not extract product data. Are you sure this link points to a product page?"
                    .to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CrawlError>;

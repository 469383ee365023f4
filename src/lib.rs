//! `pricetrack` - retail price crawling and normalization
//!
//! # Features
//!
//! - **Per-shop extractors**: twelve Dutch webshops, each read the way the
//!   shop exposes its data (JSON-LD, embedded JS state, microdata, APIs)
//! - **Uniform results**: every crawl yields a validated [`CrawlResult`]
//! - **Promotion decoding**: "1+1 GRATIS" and friends become unit prices
//! - **Batch updates**: one polite worker per shop, all shops in parallel
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::BTreeSet;
//! use std::sync::Arc;
//!
//! use pricetrack::{Crawler, HttpFetcher, ShopRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = ShopRegistry::builtin(&BTreeSet::new());
//!     let crawler = Crawler::new(registry, Arc::new(HttpFetcher::new()?));
//!
//!     let result = crawler
//!         .crawl("https://www.ah.nl/producten/product/wi395004/ah-hagelslag-puur")
//!         .await?;
//!     println!("{result}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod history;
pub mod http_client;
pub mod promotion;
pub mod result;
pub mod scheduler;
pub mod shop;

pub use config::Config;
pub use crawler::Crawler;
pub use error::{CrawlError, InvalidResult};
pub use history::{should_crawl, Offer, OfferStats, PricePoint};
pub use http_client::{FetchError, FetchResponse, HttpFetcher, PageFetcher, StaticFetcher};
pub use promotion::parse_promotion;
pub use result::{CrawlResult, PRICE_UNKNOWN};
pub use scheduler::{CrawlOutcome, Scheduler};
pub use shop::{Extractor, ShopRegistration, ShopRegistry};

/// Version of pricetrack
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

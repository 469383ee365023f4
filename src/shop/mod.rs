//! Shop-specific product extraction.
//!
//! Every supported webshop has its own [`Extractor`]. They share no parsing
//! logic beyond the small lookup helpers in [`page`]: each shop's markup
//! changes on its own schedule, so each extractor is free to read whatever
//! the shop exposes (JSON-LD, embedded JS state, microdata, meta tags, a JSON
//! API).
//!
//! # Architecture
//!
//! - [`Extractor`]: async trait turning a product URL into a [`CrawlResult`]
//! - [`ShopRegistry`]: hostname → extractor table, built once at startup
//! - [`ShopRegistration`]: one row of that table
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::BTreeSet;
//! use pricetrack::shop::ShopRegistry;
//!
//! let registry = ShopRegistry::builtin(&BTreeSet::new());
//! assert!(registry.resolve("www.jumbo.com").is_some());
//! ```

pub mod ah;
pub mod brandzaak;
pub mod ekoplaza;
pub mod etos;
pub mod hema;
pub mod ikea;
pub mod intergamma;
pub mod jumbo;
pub(crate) mod page;
pub mod pipashop;
pub mod praxis;
pub mod simonlevelt;
pub mod steam;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::http_client::PageFetcher;
use crate::result::CrawlResult;

/// Extraction logic for one webshop.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short shop identifier used in logs and errors (e.g. "jumbo").
    fn name(&self) -> &'static str;

    /// Fetch `url` through `fetcher` and turn the page into a result.
    ///
    /// The returned result has not been validated yet and `on_sale` is not
    /// final; [`Crawler`](crate::Crawler) takes care of both.
    async fn extract(&self, url: &str, fetcher: &dyn PageFetcher) -> Result<CrawlResult>;
}

/// A shop known to the registry.
pub struct ShopRegistration {
    pub display_name: &'static str,
    pub hostname: String,
    pub extractor: Arc<dyn Extractor>,
    pub enabled: bool,
}

impl std::fmt::Debug for ShopRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopRegistration")
            .field("display_name", &self.display_name)
            .field("hostname", &self.hostname)
            .field("extractor", &self.extractor.name())
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Maps request hostnames to shop extractors.
///
/// Populated once, then only read. Disabled shops are remembered for
/// listing purposes but never resolve.
pub struct ShopRegistry {
    hosts: HashMap<String, Arc<ShopRegistration>>,
    registrations: Vec<Arc<ShopRegistration>>,
    disabled: BTreeSet<String>,
}

impl ShopRegistry {
    /// Empty registry that will skip the given hostnames on registration.
    ///
    /// A leading `www.` on disabled entries is ignored.
    #[must_use]
    pub fn new(disabled: &BTreeSet<String>) -> Self {
        let disabled = disabled
            .iter()
            .map(|host| strip_www(host).to_ascii_lowercase())
            .collect();

        Self {
            hosts: HashMap::new(),
            registrations: Vec::new(),
            disabled,
        }
    }

    /// Registry with every supported shop, minus the disabled ones.
    #[must_use]
    pub fn builtin(disabled: &BTreeSet<String>) -> Self {
        let mut registry = Self::new(disabled);

        registry.register("Albert Heijn", "ah.nl", ah::AlbertHeijnExtractor, true);
        registry.register("Brandzaak", "brandzaak.nl", brandzaak::BrandzaakExtractor, true);
        registry.register("Ekoplaza", "ekoplaza.nl", ekoplaza::EkoplazaExtractor, true);
        registry.register("Etos", "etos.nl", etos::EtosExtractor, true);
        registry.register("Gamma", "gamma.nl", intergamma::IntergammaExtractor::gamma(), true);
        registry.register("HEMA", "hema.nl", hema::HemaExtractor, true);
        registry.register("IKEA", "ikea.com", ikea::IkeaExtractor, true);
        registry.register("Jumbo", "jumbo.com", jumbo::JumboExtractor, true);
        registry.register("Karwei", "karwei.nl", intergamma::IntergammaExtractor::karwei(), true);
        registry.register("Pipa Shop", "pipa-shop.nl", pipashop::PipaShopExtractor, true);
        registry.register("Praxis", "praxis.nl", praxis::PraxisExtractor, true);
        registry.register(
            "Simon Lévelt",
            "simonlevelt.nl",
            simonlevelt::SimonLeveltExtractor,
            true,
        );
        registry.register("Steam", "store.steampowered.com", steam::SteamExtractor, false);

        registry
    }

    /// Register `extractor` for `hostname`, and for `www.<hostname>` when
    /// `include_www` is set. A later registration for the same hostname
    /// replaces the earlier one.
    pub fn register(
        &mut self,
        display_name: &'static str,
        hostname: &str,
        extractor: impl Extractor + 'static,
        include_www: bool,
    ) {
        let hostname = hostname.to_ascii_lowercase();
        let enabled = !self.disabled.contains(strip_www(&hostname));

        let registration = Arc::new(ShopRegistration {
            display_name,
            hostname: hostname.clone(),
            extractor: Arc::new(extractor),
            enabled,
        });
        self.registrations
            .retain(|existing| existing.hostname != hostname);
        self.registrations.push(Arc::clone(&registration));

        if !enabled {
            debug!(shop = display_name, %hostname, "shop is disabled");
            return;
        }

        if include_www {
            self.hosts
                .insert(format!("www.{hostname}"), Arc::clone(&registration));
        }
        self.hosts.insert(hostname.clone(), registration);
        debug!(shop = display_name, %hostname, include_www, "shop is enabled");
    }

    /// Registration handling `hostname`, if any enabled shop does.
    pub fn resolve(&self, hostname: &str) -> Option<&ShopRegistration> {
        self.hosts
            .get(&hostname.to_ascii_lowercase())
            .map(AsRef::as_ref)
    }

    /// All registered shops, enabled or not, sorted by display name.
    pub fn shops(&self) -> Vec<&ShopRegistration> {
        let mut shops: Vec<&ShopRegistration> =
            self.registrations.iter().map(AsRef::as_ref).collect();
        shops.sort_by_key(|shop| shop.display_name.to_lowercase());
        shops
    }
}

impl Default for ShopRegistry {
    fn default() -> Self {
        Self::builtin(&BTreeSet::new())
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

//! Steam store (store.steampowered.com).
//!
//! A game page lists one purchase block per package (base game, bundles,
//! editions). The base game's block is the first one carrying only the
//! `game_area_purchase_game` class; without one, the last block is used.
//! Prices are given in cents.

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tracing::{debug, info};

use super::page::{all, attr, first_in, meta, parse_price, text};
use super::Extractor;
use crate::error::{CrawlError, Result};
use crate::http_client::{fetch_page, PageFetcher, StatusPolicy};
use crate::result::CrawlResult;

const SHOP: &str = "steam";

pub struct SteamExtractor;

#[async_trait]
impl Extractor for SteamExtractor {
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
    let game = purchase_block(&doc)
        .ok_or_else(|| CrawlError::missing(SHOP, "game_area_purchase_game"))?;

    let canonical = meta(&doc, "og:url").unwrap_or_else(|| {
        info!(url, "no canonical url, keeping request url");
        url.to_string()
    });
    let mut result = CrawlResult::new(canonical);

    result.product_name = first_in(game, "h1")
        .and_then(text)
        .map(|title| title.replace("Buy ", ""))
        .ok_or_else(|| CrawlError::missing(SHOP, "h1"))?;
    result.product_code = first_in(game, r#"input[name="subid"][type="hidden"]"#)
        .and_then(|el| attr(el, "value"))
        .ok_or_else(|| CrawlError::missing(SHOP, "subid"))?;

    let discount = first_in(game, "div.discount_block").and_then(cents);
    match discount {
        Some(price) if price > 0.0 => {
            result.discount_price = price;
            result.on_sale = true;
        }
        _ => {
            debug!(?discount, "no paid discount, looking for normal price");
            result.normal_price = first_in(game, "div.game_purchase_price")
                .and_then(cents)
                .or(discount)
                .ok_or_else(|| CrawlError::missing(SHOP, "game_purchase_price"))?;
        }
    }

    Ok(result)
}

fn purchase_block(doc: &Html) -> Option<ElementRef<'_>> {
    let blocks = all(doc, "div.game_area_purchase_game");
    blocks
        .iter()
        .find(|block| block.value().classes().count() == 1)
        .or_else(|| blocks.last())
        .copied()
}

fn cents(el: ElementRef<'_>) -> Option<f64> {
    attr(el, "data-price-final")
        .as_deref()
        .and_then(parse_price)
        .map(|cents| cents / 100.0)
}

//! `pricetrack` CLI - check product pages and keep offer price histories up to date

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pricetrack::{
    should_crawl, Config, CrawlError, Crawler, HttpFetcher, Offer, Scheduler, ShopRegistry,
};

#[derive(Parser)]
#[command(name = "pricetrack")]
#[command(about = "Track retail product prices across Dutch webshops")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/pricetrack/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable a shop by hostname, in addition to the configured ones
    #[arg(long = "disable", value_name = "HOSTNAME", global = true)]
    disabled: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl one product URL and print the result
    Check {
        /// Product page URL
        url: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported shops
    Shops,

    /// Crawl a product URL and start tracking it in an offers file
    Add {
        /// Product page URL
        url: String,

        /// Offers file to add to (created if missing)
        offers: PathBuf,
    },

    /// Crawl every offer in a JSON offers file that was not checked today
    Update {
        /// Offers file (JSON array of {"url": ..., "prices": [...]})
        offers: PathBuf,

        /// Write the updated offers here instead of back to the input file
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Crawl offers even if they were already checked today
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    config.disabled_shops.extend(cli.disabled);

    match cli.command {
        Commands::Check { url, json } => cmd_check(&config, &url, json).await?,
        Commands::Shops => cmd_shops(&config),
        Commands::Add { url, offers } => cmd_add(&config, &url, &offers).await?,
        Commands::Update { offers, out, force } => {
            cmd_update(&config, &offers, out.as_deref().unwrap_or(&offers), force).await?;
        }
    }

    Ok(())
}

fn build_crawler(config: &Config) -> Result<Crawler> {
    let fetcher =
        HttpFetcher::with_timeout(config.timeout()).context("failed to build HTTP client")?;
    Ok(Crawler::new(ShopRegistry::builtin(&config.disabled_shops), Arc::new(fetcher)))
}

async fn cmd_check(config: &Config, url: &str, json: bool) -> Result<()> {
    let crawler = build_crawler(config)?;

    let result = crawler.crawl(url).await.map_err(explain)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("🛒 {}", result.product_name);
    println!("   code:     {}", result.product_code);
    if let Some(ean) = result.ean {
        println!("   ean:      {ean}");
    }
    if let Some(description) = &result.product_description {
        println!("   about:    {description}");
    }
    if result.on_sale {
        println!("   price:    {:.2} (on sale)", result.discount_price);
        if result.normal_price >= 0.0 {
            println!("   normally: {:.2}", result.normal_price);
        }
    } else {
        println!("   price:    {:.2}", result.normal_price);
    }
    println!("   url:      {}", result.url);

    Ok(())
}

fn cmd_shops(config: &Config) {
    let registry = ShopRegistry::builtin(&config.disabled_shops);

    println!("{:<16} {:<26} STATUS", "SHOP", "HOSTNAME");
    for shop in registry.shops() {
        let status = if shop.enabled { "enabled" } else { "disabled" };
        println!("{:<16} {:<26} {status}", shop.display_name, shop.hostname);
    }
}

async fn cmd_add(config: &Config, url: &str, path: &Path) -> Result<()> {
    let mut offers = if path.exists() {
        load_offers(path)?
    } else {
        Vec::new()
    };
    if offers.iter().any(|offer| offer.url == url) {
        bail!("{url} is already tracked in {}", path.display());
    }

    let crawler = build_crawler(config)?;
    let result = crawler.crawl(url).await.map_err(explain)?;

    let mut offer = Offer::new(url);
    offer.record(&result, Utc::now());
    println!("➕ {} ({})", result.product_name, result.product_code);
    offers.push(offer);

    save_offers(path, &offers)
}

async fn cmd_update(config: &Config, input: &Path, output: &Path, force: bool) -> Result<()> {
    let mut offers = load_offers(input)?;

    let now = Local::now();
    let mut seen = HashSet::new();
    let due: Vec<String> = offers
        .iter()
        .filter(|offer| {
            let last = offer.last_observed().map(|t| t.with_timezone(&Local));
            force || should_crawl(last.as_ref(), &now)
        })
        .map(|offer| offer.url.clone())
        .filter(|url| seen.insert(url.clone()))
        .collect();

    println!("📋 {} offers, {} due for a crawl", offers.len(), due.len());

    if !due.is_empty() {
        let (delay_min, delay_max) = config.delay_range();
        let scheduler = Scheduler::new(Arc::new(build_crawler(config)?), delay_min, delay_max);

        let mut updated = 0;
        for outcome in scheduler.run(&due).await {
            let Ok(result) = outcome.result else { continue };
            let observed_at = Utc::now();
            for offer in offers.iter_mut().filter(|o| o.url == outcome.url) {
                offer.record(&result, observed_at);
            }
            updated += 1;
        }
        println!("✅ updated {updated} of {}", due.len());
    }

    for offer in &offers {
        let stats = offer.stats();
        let name = offer.product_name.as_deref().unwrap_or(&offer.url);
        match (stats.average, stats.minimum, stats.maximum) {
            (Some(avg), Some(min), Some(max)) => println!(
                "   {name}: avg {avg:.2}, min {min:.2}, max {max:.2}, sd {:.2} ({} prices)",
                stats.std_dev, stats.count
            ),
            _ => println!("   {name}: no prices yet"),
        }
    }

    save_offers(output, &offers)
}

/// Keep the full error as the cause behind the user-facing message.
fn explain(err: CrawlError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

fn load_offers(path: &Path) -> Result<Vec<Offer>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid offers file {}", path.display()))
}

fn save_offers(path: &Path, offers: &[Offer]) -> Result<()> {
    let json = serde_json::to_string_pretty(offers)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

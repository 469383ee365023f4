//! Batch crawling: shops in parallel, one shop's offers in sequence.
//!
//! Each shop gets a single worker so no shop sees more than one request at a
//! time from us, and the worker pauses for a random interval between
//! requests. A failing offer is logged and skipped.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::crawler::Crawler;
use crate::error::{CrawlError, Result};
use crate::result::CrawlResult;

/// Outcome of crawling one URL in a batch.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub url: String,
    pub result: Result<CrawlResult>,
}

/// Runs batches of crawls against a shared [`Crawler`].
pub struct Scheduler {
    crawler: Arc<Crawler>,
    delay_min: Duration,
    delay_max: Duration,
}

impl Scheduler {
    /// Pauses are drawn uniformly from `[delay_min, delay_max]`; the bounds
    /// are swapped if given in the wrong order.
    pub fn new(crawler: Arc<Crawler>, delay_min: Duration, delay_max: Duration) -> Self {
        let (delay_min, delay_max) = if delay_min <= delay_max {
            (delay_min, delay_max)
        } else {
            (delay_max, delay_min)
        };
        Self {
            crawler,
            delay_min,
            delay_max,
        }
    }

    /// Crawl every URL and return one outcome per URL, grouped by host in
    /// host order and in input order within a host.
    pub async fn run(&self, urls: &[String]) -> Vec<CrawlOutcome> {
        let groups = group_by_host(urls);
        info!(urls = urls.len(), shops = groups.len(), "starting batch");

        let workers: Vec<_> = groups
            .iter()
            .map(|(host, urls)| self.run_shop(host, urls))
            .collect();

        let outcomes: Vec<CrawlOutcome> = futures::future::join_all(workers)
            .await
            .into_iter()
            .flatten()
            .collect();

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(total = outcomes.len(), failed, "batch finished");
        outcomes
    }

    #[instrument(skip(self, urls), fields(offers = urls.len()))]
    async fn run_shop(&self, host: &str, urls: &[&String]) -> Vec<CrawlOutcome> {
        let mut outcomes = Vec::with_capacity(urls.len());

        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                let pause = self.next_delay();
                debug!(?pause, "sleeping before next request");
                tokio::time::sleep(pause).await;
            }

            info!(%url, "crawling");
            let result = self.crawler.crawl(url).await;
            if let Err(e) = &result {
                log_failure(url, e);
            }
            outcomes.push(CrawlOutcome {
                url: (*url).clone(),
                result,
            });
        }

        outcomes
    }

    fn next_delay(&self) -> Duration {
        if self.delay_min == self.delay_max {
            return self.delay_min;
        }
        let range = self.delay_min.as_secs_f64()..=self.delay_max.as_secs_f64();
        let secs = rand::thread_rng().gen_range(range);
        Duration::from_secs_f64(secs)
    }
}

fn log_failure(url: &str, err: &CrawlError) {
    match err {
        CrawlError::PageNotFound { .. } => {
            warn!(%url, "product seems to be no longer available");
        }
        _ => error!(%url, error = %err, "could not update price, continuing"),
    }
}

/// Unparseable URLs share the empty host; the crawler rejects them.
fn group_by_host(urls: &[String]) -> BTreeMap<String, Vec<&String>> {
    let mut groups: BTreeMap<String, Vec<&String>> = BTreeMap::new();
    for url in urls {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_ascii_lowercase()))
            .unwrap_or_default();
        groups.entry(host).or_default().push(url);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::StaticFetcher;
    use crate::shop::ShopRegistry;

    const BRANDZAAK: &str = r#"<meta name="title" content="Blusdeken"><meta property="product:price:amount" content="19.95">"#;

    fn scheduler(fetcher: StaticFetcher) -> Scheduler {
        let crawler = Crawler::new(ShopRegistry::default(), Arc::new(fetcher));
        Scheduler::new(Arc::new(crawler), Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn www_and_bare_host_share_a_worker() {
        let urls = vec![
            "https://www.jumbo.com/a".to_string(),
            "https://ah.nl/producten/product/wi1/x".to_string(),
            "https://jumbo.com/b".to_string(),
            "not a url".to_string(),
        ];
        let groups = group_by_host(&urls);
        let keys: Vec<_> = groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["", "ah.nl", "jumbo.com"]);
        assert_eq!(groups["jumbo.com"], vec![&urls[0], &urls[2]]);
    }

    #[test]
    fn delay_stays_in_range() {
        let crawler =
            Arc::new(Crawler::new(ShopRegistry::default(), Arc::new(StaticFetcher::new())));
        let scheduler =
            Scheduler::new(crawler, Duration::from_millis(30), Duration::from_millis(10));
        for _ in 0..100 {
            let d = scheduler.next_delay();
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(30), "{d:?}");
        }
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let fetcher = StaticFetcher::new()
            .with_page("https://www.brandzaak.nl/a", BRANDZAAK)
            .with_page("https://www.brandzaak.nl/c", BRANDZAAK);
        let urls = vec![
            "https://www.brandzaak.nl/a".to_string(),
            "https://www.brandzaak.nl/b".to_string(),
            "https://www.brandzaak.nl/c".to_string(),
            "https://example.com/x".to_string(),
        ];

        let outcomes = scheduler(fetcher).run(&urls).await;
        assert_eq!(outcomes.len(), 4);

        let ok: Vec<_> = outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.url.as_str())
            .collect();
        assert_eq!(ok, vec!["https://www.brandzaak.nl/a", "https://www.brandzaak.nl/c"]);
        assert!(outcomes
            .iter()
            .any(|o| matches!(o.result, Err(CrawlError::WebsiteNotImplemented { .. }))));
    }

    #[tokio::test]
    async fn empty_batch() {
        assert!(scheduler(StaticFetcher::new()).run(&[]).await.is_empty());
    }
}

//! Page fetching.
//!
//! Extractors never talk to `reqwest` directly; they go through the
//! [`PageFetcher`] trait so a crawl can be replayed against fixtures.
//!
//! - [`HttpFetcher`]: the real client (rustls, gzip/brotli, bounded redirects,
//!   fixed per-request timeout)
//! - [`StaticFetcher`]: canned responses keyed by URL, with a request log

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::error::CrawlError;

/// Timeout applied to every request unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("pricetrack/", env!("CARGO_PKG_VERSION"));

/// Extra request headers, e.g. a browser-like header set for shops that
/// reject unknown clients.
pub type Headers = &'static [(&'static str, &'static str)];

/// Status code and body of a completed request.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

/// Transport-level fetch failures. HTTP error statuses are not errors at
/// this layer; they come back in [`FetchResponse::status`].
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid header {0}")]
    InvalidHeader(String),
}

/// Something that can GET a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, headers: Headers) -> Result<FetchResponse, FetchError>;
}

/// Which statuses an extractor treats as "product gone".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Anything but 200 means the page is not available.
    RequireOk,
    /// Only 404 means not found; other statuses are parsed anyway.
    NotFoundOnly,
}

/// Fetch `fetch_url` on behalf of the product page `page_url` and return the
/// body, translating statuses per `policy` and transport failures into
/// extraction errors for `shop`.
pub async fn fetch_page(
    fetcher: &dyn PageFetcher,
    shop: &'static str,
    page_url: &str,
    fetch_url: &str,
    headers: Headers,
    policy: StatusPolicy,
) -> Result<String, CrawlError> {
    let response = fetcher
        .fetch(fetch_url, headers)
        .await
        .map_err(|e| CrawlError::fetch(shop, &e))?;

    let gone = match policy {
        StatusPolicy::RequireOk => response.status != 200,
        StatusPolicy::NotFoundOnly => response.status == 404,
    };
    if gone {
        warn!(shop, status = response.status, url = fetch_url, "page not available");
        return Err(CrawlError::not_found(page_url));
    }

    Ok(response.body)
}

/// `reqwest`-backed fetcher used in production.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the default 10 second timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a fetcher with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .connect_timeout(timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    fn header_map(headers: Headers) -> Result<HeaderMap, FetchError> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for &(name, value) in headers {
            let header = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
                .map_err(|_| FetchError::InvalidHeader(name.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| FetchError::InvalidHeader(name.to_string()))?;
            map.insert(header, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip(self, headers), fields(url = %url))]
    async fn fetch(&self, url: &str, headers: Headers) -> Result<FetchResponse, FetchError> {
        debug!("fetching");
        let response = self
            .client
            .get(url)
            .headers(Self::header_map(headers)?)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status().as_u16();
        debug!(status, version = ?response.version(), "response received");

        let body = response.text().await.map_err(|e| self.classify(&e))?;
        Ok(FetchResponse { status, body })
    }
}

impl HttpFetcher {
    fn classify(&self, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Fetcher serving canned responses. Unknown URLs answer 404.
///
/// Every requested URL is recorded, so callers can assert that a code path
/// did or did not touch the network.
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, FetchResponse>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for `url`.
    #[must_use]
    pub fn with(mut self, url: impl Into<String>, response: FetchResponse) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    /// Serve `body` with status 200 for `url`.
    #[must_use]
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with(url, FetchResponse::ok(body))
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, _headers: Headers) -> Result<FetchResponse, FetchError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(url.to_string());
        }
        Ok(self
            .responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchResponse::status(404)))
    }
}

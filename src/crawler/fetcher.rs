//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with timeouts, redirect limits and compression
//! - GET requests sent with the crawl's user agent
//! - Error classification into [`FetchError`]
//!
//! The engine only sees the [`Fetcher`] trait, so tests and embedders can
//! swap [`HttpFetcher`] for an in-memory implementation.

use crate::CrawlError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, CONTENT_ENCODING, CONTENT_TYPE, LAST_MODIFIED, USER_AGENT};
use reqwest::{redirect::Policy, Client};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;
use url::Url;

/// Settings for the default HTTP fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherSettings {
    /// Connection timeout
    pub connect_timeout: Duration,

    /// Whole-request timeout, body included
    pub request_timeout: Duration,

    /// Maximum redirect hops followed per fetch
    pub max_redirects: usize,

    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_redirects: 10,
            accept_invalid_certs: false,
        }
    }
}

/// A fetched page
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL after redirects
    pub resolved_url: Url,

    /// HTTP status code
    pub status: u16,

    /// Response headers, lowercased names; repeated headers are joined with ", "
    pub headers: BTreeMap<String, String>,

    /// Media type without parameters, e.g. `text/html`
    pub content_type: Option<String>,

    /// `charset` parameter of the Content-Type header
    pub charset: Option<String>,

    pub content_encoding: Option<String>,

    pub last_modified: Option<String>,

    /// Decoded page body
    pub body: String,

    pub fetched_at: DateTime<Utc>,
}

impl Response {
    /// Whether the body should be scanned for links
    ///
    /// A missing Content-Type is treated as HTML.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct == "text/html" || ct == "application/xhtml+xml")
            .unwrap_or(true)
    }
}

/// Why a single fetch failed
///
/// Fetch errors are carried in visit events and never stop the crawl.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("redirect error: {0}")]
    Redirect(String),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("fetch failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if e.is_redirect() {
            FetchError::Redirect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus(status.as_u16())
        } else {
            FetchError::Other(e.to_string())
        }
    }
}

/// Outcome of one fetch
pub type FetchResult = Result<Response, FetchError>;

/// Retrieves a page
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, user_agent: &str) -> FetchResult;
}

/// [`Fetcher`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher from the given settings
    ///
    /// # Example
    ///
    /// ```
    /// use ripple_crawl::crawler::{FetcherSettings, HttpFetcher};
    ///
    /// let fetcher = HttpFetcher::new(&FetcherSettings::default()).unwrap();
    /// ```
    pub fn new(settings: &FetcherSettings) -> Result<Self, CrawlError> {
        Ok(Self {
            client: build_http_client(settings)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, user_agent: &str) -> FetchResult {
        let url = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        trace!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let resolved_url = response.url().clone();
        let headers = response.headers();
        let (content_type, charset) = parse_content_type(header_value(headers, CONTENT_TYPE));
        let content_encoding = header_value(headers, CONTENT_ENCODING).map(str::to_string);
        let last_modified = header_value(headers, LAST_MODIFIED).map(str::to_string);
        let headers = collect_headers(headers);

        let body = response.text().await.map_err(|e| FetchError::Body(e.to_string()))?;

        Ok(Response {
            resolved_url,
            status: status.as_u16(),
            headers,
            content_type,
            charset,
            content_encoding,
            last_modified,
            body,
            fetched_at: Utc::now(),
        })
    }
}

/// Builds an HTTP client with proper configuration
///
/// The user agent is sent per request, since it belongs to the crawl
/// options rather than the client.
pub fn build_http_client(settings: &FetcherSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(settings.request_timeout)
        .connect_timeout(settings.connect_timeout)
        .redirect(Policy::limited(settings.max_redirects))
        .danger_accept_invalid_certs(settings.accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

fn header_value(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    map
}

/// Splits a Content-Type header into its media type and charset
fn parse_content_type(value: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(value) = value else {
        return (None, None);
    };

    let mut parts = value.split(';');
    let media_type = parts
        .next()
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty());

    let charset = parts.find_map(|param| {
        let (key, val) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(val.trim().trim_matches('"').to_ascii_lowercase())
        } else {
            None
        }
    });

    (media_type, charset)
}

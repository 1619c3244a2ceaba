//! HTTP fetcher implementation
//!
//! This module handles all outbound HTTP for the crawler:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Single-attempt GETs with error classification
//! - An explicit retry policy with fixed back-off
//! - Fetching numbered listing pages

use crate::config::{Config, CrawlerConfig};
use crate::url::listing_page_url;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A single failed GET
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid listing URL: {0}")]
    InvalidUrl(#[from] crate::UrlError),
}

/// Errors a [`RetryPolicy`] may try again
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for FetchError {
    /// Network errors, timeouts, 429 and 5xx are worth another attempt
    fn is_transient(&self) -> bool {
        match self {
            Self::Request { .. } => true,
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            Self::InvalidUrl(_) => false,
        }
    }
}

/// A listing page that could not be fetched
#[derive(Debug, Error)]
#[error("page {page} failed after {attempts} attempt(s): {source}")]
pub struct FetchFailed {
    pub page: u32,
    pub attempts: u32,
    pub source: FetchError,
}

/// The last error of an operation that never succeeded
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Bounded retry with a fixed back-off between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out
    ///
    /// `op` receives the 1-based attempt number. The back-off is slept only
    /// between attempts, never after the last one.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        self.backoff
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    })
                }
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use job_harvest::config::Config;
/// use job_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(config.crawler.request_timeout())
        .connect_timeout(config.crawler.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// One GET, returning the body of a 2xx response
pub async fn fetch_text(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })
}

/// Fetches numbered listing pages
pub struct PageFetcher {
    client: Client,
    root: Url,
    listing_path: String,
    page_param: String,
    policy: RetryPolicy,
}

impl PageFetcher {
    pub fn new(client: Client, root: Url, config: &Config) -> Self {
        Self {
            client,
            root,
            listing_path: config.site.listing_path.clone(),
            page_param: config.site.page_param.clone(),
            policy: RetryPolicy::from_config(&config.crawler),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn page_url(&self, page: u32) -> Result<Url, FetchError> {
        Ok(listing_page_url(
            &self.root,
            &self.listing_path,
            &self.page_param,
            page,
        )?)
    }

    /// Fetches one listing page, retrying transient failures
    pub async fn fetch_page(&self, page: u32) -> Result<String, FetchFailed> {
        let url = self.page_url(page).map_err(|source| FetchFailed {
            page,
            attempts: 0,
            source,
        })?;
        let url = url.as_str();
        let client = &self.client;

        tracing::info!("Crawling page {} ({})", page, url);

        self.policy
            .run(|_attempt| fetch_text(client, url))
            .await
            .map_err(|exhausted| FetchFailed {
                page,
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            })
    }
}

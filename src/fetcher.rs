//! # Page Fetcher Module
//!
//! Retrieves listing and detail pages for the scraping pipeline. This is the
//! only component that talks to source websites.
//!
//! ## Key Components
//!
//! - `Fetcher`: a reqwest client with a browser-like header set and bounded timeout
//! - `FetcherConfig`: headers, timeout and content limits
//! - `FetchError`: typed failures (timeout, non-2xx status, transport errors)
//! - Content helpers for narrowing markup before extraction
//!
//! ## Behavior
//!
//! - No retries: a failed source is reported and skipped for the run
//! - Errors never escape as panics; callers always get a `FetchError`

mod config;
pub mod content;
mod error;

pub use config::{DEFAULT_USER_AGENT, FetcherConfig, FetcherConfigBuilder};
pub use content::{clean_html, has_calendar_table, month_page_urls, resolve_url};
pub use error::FetchError;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, instrument, warn};
use url::Url;

/// HTTP client for source pages
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a fetcher from configuration
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            (USER_AGENT, &config.user_agent),
            (ACCEPT, &config.accept),
            (ACCEPT_LANGUAGE, &config.accept_language),
        ] {
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::InvalidHeader(format!("{}: {}", name.as_str(), e)))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self { client, config })
    }

    /// The configuration this fetcher was built with
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch a page and return its markup
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL of the page
    ///
    /// # Returns
    ///
    /// The raw HTML body, or a `FetchError` for timeouts, non-2xx answers and
    /// transport failures
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url)?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::from_request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Non-success status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_request(url, e))?;
        debug!("Fetched {} bytes", body.len());
        Ok(body)
    }

    /// Narrow fetched markup for the extractor using this fetcher's limits
    pub fn clean(&self, html: &str) -> String {
        clean_html(
            html,
            &self.config.exclude_selectors,
            self.config.max_content_chars,
        )
    }
}

// src/fetch.rs

//! Page fetching.
//!
//! The executor only cares about "body or no body": any HTTP failure,
//! non-success status, or unreadable body is reported as `None` and handled
//! as a page-level failure upstream. No retries.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ScraperConfig;
use crate::error::Result;

/// Fetches a URL and returns its body as text, or `None` on any failure.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}

/// HTTP fetcher over a shared `reqwest` client.
///
/// The same client (User-Agent, timeout) is used for every fetch within a
/// run, so listing and description requests present identically to the host.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from scraper configuration.
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                log::debug!("Fetch failed for {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            log::debug!("Fetch for {} returned HTTP {}", url, response.status());
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                log::debug!("Body read failed for {}: {}", url, e);
                None
            }
        }
    }
}

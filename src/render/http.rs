//! HTTP renderer using wreq for TLS fingerprint emulation.
//!
//! Pages are fetched once and served as static HTML. Content that only appears
//! after client-side scripts run is not visible to this renderer.

use super::element::select_document;
use super::{Element, PageHandle, Renderer};
use crate::config::Config;
use crate::error::FetchError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, trace, warn};
use wreq::Client;
use wreq_util::Emulation;

/// Renderer backed by a browser-impersonating HTTP client.
pub struct HttpRenderer {
    client: Client,
    timeout_secs: u64,
}

impl HttpRenderer {
    /// Creates a renderer from the harvester configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self { client, timeout_secs: config.timeout_secs })
    }

    async fn get(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8")
            .header("Accept-Language", "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7")
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .header("Sec-Ch-Ua", "\"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"")
            .header("Sec-Ch-Ua-Mobile", "?0")
            .header("Sec-Ch-Ua-Platform", "\"macOS\"")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header("Sec-Fetch-User", "?1")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == 429 || status == 503 {
            warn!("Rate limited ({}) on {}. Consider a proxy or longer delays.", status, url);
        }

        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }

        response.text().await.map_err(|e| self.request_error(url, e))
    }

    fn request_error(&self, url: &str, err: wreq::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout { url: url.to_string(), secs: self.timeout_secs }
        } else {
            FetchError::Navigation { url: url.to_string(), reason: err.to_string() }
        }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn open_page(&self, url: &str) -> Result<Box<dyn PageHandle>, FetchError> {
        let html = self.get(url).await?;
        Ok(Box::new(HttpPage { url: url.to_string(), html }))
    }
}

/// A fetched document.
struct HttpPage {
    url: String,
    html: String,
}

#[async_trait]
impl PageHandle for HttpPage {
    async fn wait_load(&mut self) -> Result<(), FetchError> {
        // The body has been read in full by the time the handle exists.
        if self.html.trim().is_empty() {
            return Err(FetchError::Navigation {
                url: self.url.clone(),
                reason: "empty document".to_string(),
            });
        }
        Ok(())
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<Option<Element>>, FetchError> {
        Ok(select_document(&self.html, selector)?.into_iter().map(Some).collect())
    }

    async fn close(self: Box<Self>) -> Result<(), FetchError> {
        trace!("Closing page {}", self.url);
        Ok(())
    }
}

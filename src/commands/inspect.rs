//! Page diagnosis for selector maintenance.
//!
//! Loads one page and reports what the diagnostic selectors match, so broken
//! selector chains or block pages can be spotted without running a cycle.

use crate::config::Config;
use crate::error::FetchError;
use crate::format::{truncate, Formatter};
use crate::listing::extractor::normalize;
use crate::listing::selectors::{BLOCKING_KEYWORDS, DIAGNOSTIC};
use crate::render::{HttpRenderer, PageHandle, Renderer, StaticRenderer};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const PREVIEW_CHARS: usize = 100;

/// Match summary for one selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorMatch {
    pub selector: String,
    pub count: usize,
    /// Text of the first match, whitespace-collapsed and shortened
    pub preview: Option<String>,
}

/// Everything `inspect` found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub url: String,
    pub title: Option<String>,
    /// Length of the body text in characters
    pub body_length: usize,
    pub selectors: Vec<SelectorMatch>,
    pub blocking_keywords: Vec<&'static str>,
}

/// Diagnoses a results page.
pub struct InspectCommand {
    config: Config,
}

impl InspectCommand {
    /// Creates a new inspect command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Inspects `url` (the configured base URL by default), or a saved HTML file.
    pub async fn execute(&self, url: Option<&str>, html_file: Option<&Path>) -> Result<String> {
        let url = url.unwrap_or(self.config.base_url.as_str());

        match html_file {
            Some(path) => {
                let html = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read HTML file: {}", path.display()))?;
                let renderer = StaticRenderer::new().with_fallback(html);
                self.execute_with_renderer(&renderer, url, Duration::ZERO).await
            }
            None => {
                let renderer =
                    HttpRenderer::new(&self.config).context("Failed to create HTTP client")?;
                let settle = Duration::from_millis(self.config.settle_delay_ms);
                self.execute_with_renderer(&renderer, url, settle).await
            }
        }
    }

    /// Inspects `url` with a provided renderer (for testing).
    pub async fn execute_with_renderer(
        &self,
        renderer: &dyn Renderer,
        url: &str,
        settle: Duration,
    ) -> Result<String> {
        let report = diagnose(renderer, url, settle).await?;
        Ok(Formatter::new(self.config.format).format_inspect(&report))
    }
}

/// Loads `url` and reports on it. The page is closed on every path.
pub async fn diagnose(renderer: &dyn Renderer, url: &str, settle: Duration) -> Result<InspectReport> {
    info!("Inspecting {}", url);

    let mut page = renderer.open_page(url).await?;
    let result = scan_page(page.as_mut(), url, settle).await;

    if let Err(e) = page.close().await {
        warn!("Failed to close page {}: {}", url, e);
    }

    Ok(result?)
}

async fn scan_page(
    page: &mut dyn PageHandle,
    url: &str,
    settle: Duration,
) -> Result<InspectReport, FetchError> {
    page.wait_load().await?;
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }

    let title = page
        .query_selector_all("title")
        .await?
        .into_iter()
        .flatten()
        .next()
        .map(|t| normalize(&t.text()))
        .filter(|t| !t.is_empty());

    let mut selectors = Vec::with_capacity(DIAGNOSTIC.len());
    for selector in DIAGNOSTIC {
        let found = page.query_selector_all(selector).await?;
        let preview = found
            .first()
            .and_then(|e| e.as_ref())
            .map(|e| normalize(&e.text()))
            .filter(|t| !t.is_empty())
            .map(|t| truncate(&t, PREVIEW_CHARS));
        selectors.push(SelectorMatch { selector: selector.to_string(), count: found.len(), preview });
    }

    let body_text = page
        .query_selector_all("body")
        .await?
        .into_iter()
        .flatten()
        .next()
        .map(|b| b.text())
        .unwrap_or_default();

    let lowered = body_text.to_lowercase();
    let blocking_keywords: Vec<&'static str> =
        BLOCKING_KEYWORDS.iter().copied().filter(|k| lowered.contains(k)).collect();
    for keyword in &blocking_keywords {
        warn!("Page might be blocked - found keyword: {}", keyword);
    }

    Ok(InspectReport {
        url: url.to_string(),
        title,
        body_length: body_text.chars().count(),
        selectors,
        blocking_keywords,
    })
}

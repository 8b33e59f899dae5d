//! Pagination controller: one full sweep across the results pages.

use super::fetcher::ListingFetcher;
use super::loader::PageLoader;
use super::pages::PageUrls;
use super::persist::{ListingPersister, SaveOutcome};
use super::retry::RetryPolicy;
use super::validator::PageValidator;
use crate::config::Config;
use crate::listing::{FieldExtractor, Listing};
use crate::render::Renderer;
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Bounds on one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleLimits {
    /// Highest page number ever requested
    pub max_pages: u32,
    /// Consecutive failed page checks tolerated before the sweep stops
    pub max_failed_pages: u32,
}

/// Why a sweep ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// The page had too few listing elements: the normal end of results.
    InsufficientListings { page: u32, count: usize },
    /// Too few listings and the page looked like a block/challenge page.
    Blocked { page: u32, keyword: String },
    PageCeiling,
    FailureCeiling,
    Cancelled,
}

/// Counters for one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub pages_processed: u32,
    pub new_listings_saved: u32,
    pub pages_skipped: u32,
    pub duplicates: u32,
    pub persist_failures: u32,
    pub stop_reason: StopReason,
}

impl CycleStats {
    fn new() -> Self {
        Self {
            pages_processed: 0,
            new_listings_saved: 0,
            pages_skipped: 0,
            duplicates: 0,
            persist_failures: 0,
            stop_reason: StopReason::Cancelled,
        }
    }
}

/// Drives validation, fetching and persistence page by page.
pub struct Harvester {
    urls: PageUrls,
    validator: PageValidator,
    fetcher: ListingFetcher,
    persister: ListingPersister,
    retry: RetryPolicy,
    limits: CycleLimits,
    page_delay: Duration,
    delay_jitter: Duration,
}

impl Harvester {
    /// Wires the engine from configuration. Fails on bad URLs or selectors.
    pub fn new(
        config: &Config,
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let urls = PageUrls::new(&config.base_url)?;
        let origin = config.origin(&urls)?;

        config.selectors.validate().context("Invalid selector configuration")?;
        let selectors = Arc::new(config.selectors.clone());

        let loader = PageLoader::new(
            renderer,
            Duration::from_millis(config.settle_delay_ms),
            selectors.containers.clone(),
        );

        Ok(Self {
            urls,
            validator: PageValidator::new(loader.clone(), config.min_listings),
            fetcher: ListingFetcher::new(loader, FieldExtractor::new(selectors, origin)),
            persister: ListingPersister::new(store, Duration::from_secs(config.listing_ttl_secs)),
            retry: RetryPolicy::new(
                config.retry_attempts,
                Duration::from_millis(config.retry_delay_ms),
            ),
            limits: CycleLimits {
                max_pages: config.max_pages,
                max_failed_pages: config.max_failed_pages,
            },
            page_delay: Duration::from_millis(config.page_delay_ms),
            delay_jitter: Duration::from_millis(config.delay_jitter_ms),
        })
    }

    /// Runs one sweep from page 1 until a stop condition is hit.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleStats {
        info!("Starting full parsing cycle...");

        let mut stats = CycleStats::new();
        let mut consecutive_failures = 0;
        let mut page = 1;

        let stop_reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if page > self.limits.max_pages {
                warn!("Reached maximum page limit ({}), ending pagination", self.limits.max_pages);
                break StopReason::PageCeiling;
            }

            let page_url = self.urls.page(page);
            let url = page_url.as_str();
            info!("Processing page {}...", page);

            let validator = &self.validator;
            let check = self.retry.run("page check", move || validator.check(url)).await;

            let check = match check {
                Ok(check) => {
                    consecutive_failures = 0;
                    check
                }
                Err(e) => {
                    warn!("Error checking page {}: {}, skipping...", page, e);
                    stats.pages_skipped += 1;
                    consecutive_failures += 1;
                    if consecutive_failures >= self.limits.max_failed_pages {
                        warn!(
                            "{} consecutive pages failed to load, ending pagination",
                            consecutive_failures
                        );
                        break StopReason::FailureCeiling;
                    }
                    page += 1;
                    continue;
                }
            };

            if !check.valid {
                if let Some(keyword) = check.blocked_keyword {
                    warn!("Page {} looks blocked ({}), ending pagination", page, keyword);
                    break StopReason::Blocked { page, keyword: keyword.to_string() };
                }
                info!(
                    "Found {} listings on page {} (less than minimum), ending pagination",
                    check.count, page
                );
                break StopReason::InsufficientListings { page, count: check.count };
            }

            let fetcher = &self.fetcher;
            let listings = match self.retry.run("page fetch", move || fetcher.fetch(url)).await {
                Ok(listings) => listings,
                Err(e) => {
                    warn!("Error parsing page {}: {}, skipping...", page, e);
                    stats.pages_skipped += 1;
                    page += 1;
                    continue;
                }
            };

            let saved = self.persist_all(&listings, &mut stats).await;
            info!("Found {} listings on page {}, saved {} new listings", listings.len(), page, saved);
            stats.pages_processed += 1;

            page += 1;

            if self.pause_between_pages(cancel).await {
                break StopReason::Cancelled;
            }
        };
        stats.stop_reason = stop_reason;

        info!(
            "Total cycle results: {} pages processed, {} new listings saved",
            stats.pages_processed, stats.new_listings_saved
        );
        stats
    }

    async fn persist_all(&self, listings: &[Listing], stats: &mut CycleStats) -> u32 {
        let mut saved = 0;
        for listing in listings {
            match self.persister.save_if_new(listing).await {
                Ok(SaveOutcome::Saved) => saved += 1,
                Ok(SaveOutcome::AlreadyExists) => stats.duplicates += 1,
                Err(e) => {
                    warn!("Error saving listing {}: {}", listing.id, e);
                    stats.persist_failures += 1;
                }
            }
        }
        stats.new_listings_saved += saved;
        saved
    }

    /// Sleeps the inter-page delay. Returns true if cancelled meanwhile.
    async fn pause_between_pages(&self, cancel: &CancellationToken) -> bool {
        let delay = self.page_delay + jitter(self.delay_jitter);
        if delay.is_zero() {
            return cancel.is_cancelled();
        }

        tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }
}

fn jitter(range: Duration) -> Duration {
    let max = range.as_millis() as u64;
    if max == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max))
}

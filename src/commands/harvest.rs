//! Harvest commands: a single cycle or the continuous scheduler.

use crate::config::Config;
use crate::engine::{Harvester, Scheduler};
use crate::format::Formatter;
use crate::render::{HttpRenderer, Renderer};
use crate::store::KeyValueStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs harvest cycles against the configured site.
pub struct HarvestCommand {
    config: Config,
}

impl HarvestCommand {
    /// Creates a new harvest command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs one cycle and returns the formatted statistics.
    pub async fn once(
        &self,
        store: Arc<dyn KeyValueStore>,
        cancel: CancellationToken,
    ) -> Result<String> {
        let renderer = self.http_renderer()?;
        self.once_with_renderer(renderer, store, cancel).await
    }

    /// Runs one cycle with a provided renderer (for testing).
    pub async fn once_with_renderer(
        &self,
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn KeyValueStore>,
        cancel: CancellationToken,
    ) -> Result<String> {
        let harvester = Harvester::new(&self.config, renderer, store)?;
        let stats = harvester.run_cycle(&cancel).await;

        Ok(Formatter::new(self.config.format).format_cycle(&stats))
    }

    /// Runs cycles until cancelled, or `cycles` times when given.
    pub async fn run(
        &self,
        store: Arc<dyn KeyValueStore>,
        cancel: CancellationToken,
        cycles: Option<u64>,
    ) -> Result<String> {
        let renderer = self.http_renderer()?;
        self.run_with_renderer(renderer, store, cancel, cycles).await
    }

    /// Runs the scheduler with a provided renderer (for testing).
    pub async fn run_with_renderer(
        &self,
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn KeyValueStore>,
        cancel: CancellationToken,
        cycles: Option<u64>,
    ) -> Result<String> {
        let harvester = Arc::new(Harvester::new(&self.config, renderer, store)?);

        let mut scheduler =
            Scheduler::new(harvester, Duration::from_secs(self.config.cycle_delay_secs));
        if let Some(cycles) = cycles {
            scheduler = scheduler.with_max_cycles(cycles);
        }

        info!("Harvesting {}", self.config.base_url);
        let report = scheduler.run(cancel).await;

        Ok(Formatter::new(self.config.format).format_scheduler(&report))
    }

    fn http_renderer(&self) -> Result<Arc<dyn Renderer>> {
        let renderer = HttpRenderer::new(&self.config).context("Failed to create HTTP client")?;
        Ok(Arc::new(renderer))
    }
}

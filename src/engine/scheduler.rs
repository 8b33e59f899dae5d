//! Cycle scheduler: repeats full sweeps until cancelled.

use super::controller::{CycleStats, Harvester};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Summary of a scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerReport {
    pub cycles_completed: u64,
    /// Cycles that panicked and were isolated
    pub cycles_faulted: u64,
    pub listings_saved: u64,
}

/// Runs the harvester in a loop with a pause between cycles.
pub struct Scheduler {
    harvester: Arc<Harvester>,
    cycle_delay: Duration,
    max_cycles: Option<u64>,
}

impl Scheduler {
    pub fn new(harvester: Arc<Harvester>, cycle_delay: Duration) -> Self {
        Self { harvester, cycle_delay, max_cycles: None }
    }

    /// Stops after `cycles` cycles instead of running until cancelled.
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    /// Runs cycles until `cancel` fires or the cycle limit is reached.
    ///
    /// Each cycle runs on its own task, so a panic inside one is logged and
    /// the next cycle starts on schedule.
    pub async fn run(&self, cancel: CancellationToken) -> SchedulerReport {
        let mut report = SchedulerReport::default();
        let mut cycle: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }
            if self.max_cycles.is_some_and(|max| cycle >= max) {
                break;
            }
            cycle += 1;

            info!("Starting cycle {}", cycle);
            match self.run_isolated(&cancel).await {
                Some(stats) => {
                    report.cycles_completed += 1;
                    report.listings_saved += u64::from(stats.new_listings_saved);
                    info!(
                        "Cycle {} finished ({:?}): {} pages, {} new listings",
                        cycle, stats.stop_reason, stats.pages_processed, stats.new_listings_saved
                    );
                }
                None => report.cycles_faulted += 1,
            }

            if self.max_cycles.is_some_and(|max| cycle >= max) {
                break;
            }

            info!("Waiting {:?} before next cycle...", self.cycle_delay);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.cycle_delay) => {}
            }
        }

        info!(
            "Scheduler stopped after {} cycles ({} faulted)",
            report.cycles_completed, report.cycles_faulted
        );
        report
    }

    async fn run_isolated(&self, cancel: &CancellationToken) -> Option<CycleStats> {
        let harvester = Arc::clone(&self.harvester);
        let token = cancel.clone();

        let handle = tokio::spawn(async move { harvester.run_cycle(&token).await });

        match handle.await {
            Ok(stats) => Some(stats),
            Err(e) if e.is_panic() => {
                error!("Cycle panicked: {}", panic_message(e.into_panic()));
                None
            }
            Err(e) => {
                error!("Cycle task failed: {}", e);
                None
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

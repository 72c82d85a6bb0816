use std::time::Duration;

use labwatch_logging::{set_cycle, watch_error, watch_info};
use tokio_util::sync::CancellationToken;

use crate::monitor::TargetMonitor;
use crate::{CheckOutcome, TargetRegistry};

/// Tally of one pass over the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub checked: usize,
    pub baselines: usize,
    pub changes: usize,
    pub unchanged: usize,
    pub fetch_failures: usize,
    pub persist_failures: usize,
}

impl CycleSummary {
    fn record(&mut self, outcome: &CheckOutcome) {
        self.checked += 1;
        match outcome {
            CheckOutcome::BaselineEstablished(_) => self.baselines += 1,
            CheckOutcome::Unchanged(_) => self.unchanged += 1,
            CheckOutcome::ChangeDetected { .. } => self.changes += 1,
            CheckOutcome::FetchFailed(_) => self.fetch_failures += 1,
        }
    }
}

/// Sequential polling loop over a fixed registry.
///
/// Targets are checked one at a time in registry order, so no target is ever
/// checked by two workers at once. Cancellation is observed before each
/// target and during the inter-cycle sleep; a check already in flight always
/// completes.
pub struct Scheduler {
    monitor: TargetMonitor,
    registry: TargetRegistry,
    interval: Duration,
    max_cycles: Option<u64>,
}

impl Scheduler {
    pub fn new(monitor: TargetMonitor, registry: TargetRegistry, interval: Duration) -> Self {
        Self {
            monitor,
            registry,
            interval,
            max_cycles: None,
        }
    }

    /// Stop on its own after `cycles` passes.
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// Run until cancelled (or the cycle limit is hit). Returns the number of
    /// passes started.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        watch_info!(
            "Monitoring {} target(s) every {:?}",
            self.registry.len(),
            self.interval
        );
        let mut cycle = 0;
        while !cancel.is_cancelled() {
            cycle += 1;
            set_cycle(cycle);
            let summary = self.run_cycle(&cancel).await;
            watch_info!("cycle summary: {:?}", summary);

            if self.max_cycles.is_some_and(|max| cycle >= max) {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        watch_info!("Stopped after {} cycle(s)", cycle);
        cycle
    }

    /// One pass over every target, stopping early if `cancel` trips.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleSummary {
        let mut summary = CycleSummary::default();
        for target in self.registry.iter() {
            if cancel.is_cancelled() {
                watch_info!("cancellation requested; ending cycle before {}", target.id());
                break;
            }
            match self.monitor.poll(target).await {
                Ok(outcome) => summary.record(&outcome),
                Err(err) => {
                    summary.checked += 1;
                    summary.persist_failures += 1;
                    watch_error!("{}", err);
                }
            }
        }
        summary
    }
}

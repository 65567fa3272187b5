//! Periodic driver of the federation cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use twinpeg_federation::{CycleReport, FederationCoordinator, FederationError};

/// Runs [`FederationCoordinator::run_cycle`] on a fixed interval.
///
/// Cycles never overlap: the timer loop runs each cycle inline, and a
/// manual [`trigger`](Self::trigger) while a cycle is running is skipped.
pub struct SyncWorker {
    coordinator: Arc<FederationCoordinator>,
    interval: Duration,
    busy: AtomicBool,
}

/// Clears the busy flag when the cycle ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncWorker {
    pub fn new(coordinator: Arc<FederationCoordinator>, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
            busy: AtomicBool::new(false),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run one cycle now. Returns `None` if another cycle is in progress.
    pub async fn trigger(&self) -> Option<Result<CycleReport, FederationError>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("federation cycle already running, trigger skipped");
            return None;
        }
        let _guard = BusyGuard(&self.busy);
        Some(self.coordinator.run_cycle().await)
    }

    /// Spawn the timer loop. The first cycle runs immediately; the loop
    /// exits once `shutdown_rx` fires, never in the middle of a cycle.
    pub fn spawn(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => {
                        match self.trigger().await {
                            Some(Ok(report)) if report != CycleReport::default() => {
                                tracing::info!(
                                    caught_up = report.caught_up,
                                    deposit_blocks = report.deposit_blocks,
                                    signature_rounds = report.signature_rounds,
                                    merged = report.merged,
                                    broadcasts = report.broadcasts,
                                    "federation cycle"
                                );
                            }
                            Some(Ok(_)) | None => {}
                            Some(Err(e)) => {
                                tracing::warn!(error = %e, kind = ?e.kind(), "federation cycle failed");
                            }
                        }
                    }
                }
            }
            tracing::debug!("sync worker stopped");
        })
    }

    /// Pretend a cycle is running, for exercising the skip path.
    #[cfg(test)]
    pub(crate) fn hold_busy(&self) {
        self.busy.store(true, Ordering::Release);
    }
}

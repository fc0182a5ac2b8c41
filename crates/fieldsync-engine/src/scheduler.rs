//! Sync scheduler - fixed-interval drain trigger
//!
//! Fires [`SyncProcessor::process_sync_queue`] on a fixed interval,
//! unconditionally. The first tick fires immediately, so a daemon start
//! with a populated queue begins draining right away. Triggers that land
//! while a drain is already running (or while offline) are absorbed by
//! the processor itself.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::processor::{DrainOutcome, SyncProcessor};

// ============================================================================
// SyncScheduler
// ============================================================================

/// Periodic drain trigger
///
/// Runs the drain inline rather than spawning it, so a slow pass simply
/// delays the next tick instead of stacking up triggers.
pub struct SyncScheduler {
    /// The processor to trigger
    processor: Arc<SyncProcessor>,
    /// Time between triggers
    drain_interval: Duration,
}

impl SyncScheduler {
    /// Creates a new `SyncScheduler`
    ///
    /// # Arguments
    /// * `processor` - Processor to trigger on each tick
    /// * `drain_interval` - Time between triggers
    pub fn new(processor: Arc<SyncProcessor>, drain_interval: Duration) -> Self {
        Self {
            processor,
            drain_interval,
        }
    }

    /// Main trigger loop
    ///
    /// Ticks until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            interval_ms = self.drain_interval.as_millis() as u64,
            "Sync scheduler starting"
        );

        let mut timer = tokio::time::interval(self.drain_interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Sync scheduler stopping");
                    break;
                }

                _ = timer.tick() => {
                    let report = self.processor.process_sync_queue().await;
                    if report.outcome == DrainOutcome::Completed && report.processed() > 0 {
                        info!(
                            delivered = report.delivered,
                            remapped = report.remapped,
                            discarded = report.discarded,
                            failed = report.failed,
                            "Scheduled drain finished"
                        );
                    } else {
                        debug!(outcome = ?report.outcome, "Scheduled drain tick");
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

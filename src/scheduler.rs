//! Periodic cycle driver.

use crate::engine::ReconciliationEngine;
use std::future::Future;
use std::time::Duration;
use tokio::pin;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

pub struct CycleScheduler {
    engine: ReconciliationEngine,
    interval: Duration,
}

impl CycleScheduler {
    pub fn new(engine: ReconciliationEngine, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Runs cycles forever, one at a time, until Ctrl-C.
    pub async fn run(self) -> anyhow::Result<()> {
        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        self.run_until(shutdown).await
    }

    /// Drives the tick loop until `shutdown` resolves.
    ///
    /// The cycle runs inline in the select arm, so a slow cycle simply
    /// delays the next tick. Ticks that elapse while a cycle is still
    /// running are skipped, never queued.
    async fn run_until<F: Future<Output = ()>>(self, shutdown: F) -> anyhow::Result<()> {
        pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            "Scheduler started, one cycle every {}s",
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.engine.run_cycle().await {
                        Ok(report) if report.is_no_op() => {
                            debug!("[CYCLE] {}", report);
                        }
                        Ok(report) => {
                            info!("[CYCLE] {}", report);
                        }
                        Err(err) => {
                            error!("[CYCLE_ABORTED] {}", err);
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("[SHUTDOWN] Signal received. Stopping scheduler.");
                    break;
                }
            }
        }
        Ok(())
    }
}

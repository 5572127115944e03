//! Background worker driving the reconciliation passes on their cadences

use absentia_domain::traits::IntervalStore;
use absentia_domain::{Clock, PlatformAdapter};
use tokio::time::MissedTickBehavior;

use crate::error::SchedulerError;
use crate::metrics::ReconcilerMetrics;
use crate::reconciler::Reconciler;

/// Long-running worker that ticks the three reconciliation passes
///
/// All passes run on one task, so they are mutually exclusive by
/// construction; a tick that lands while another pass is still running is
/// skipped rather than queued.
pub struct ReconcilerWorker<S, A, C> {
    reconciler: Reconciler<S, A, C>,
}

impl<S, A, C> ReconcilerWorker<S, A, C>
where
    S: IntervalStore,
    A: PlatformAdapter,
    C: Clock,
{
    /// Wrap a reconciler for background operation
    pub fn new(reconciler: Reconciler<S, A, C>) -> Self {
        Self { reconciler }
    }

    /// Metrics accumulated so far
    pub fn metrics(&self) -> &ReconcilerMetrics {
        self.reconciler.metrics()
    }

    /// Run until interrupted (Ctrl+C)
    ///
    /// Each ticker fires immediately on startup, so a fresh process
    /// converges markers and catches up on due reports right away.
    pub async fn run(mut self) {
        let config = self.reconciler.config().clone();

        let mut status_tick = tokio::time::interval(config.status_interval());
        let mut report_tick = tokio::time::interval(config.report_interval());
        let mut retention_tick = tokio::time::interval(config.retention_interval());
        status_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        report_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        retention_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            status_minutes = config.status_interval_minutes,
            report_minutes = config.report_interval_minutes,
            retention_hours = config.retention_interval_hours,
            "reconciler worker started"
        );

        loop {
            tokio::select! {
                _ = status_tick.tick() => {
                    if let Err(error) = self.reconciler.run_visible_status_pass().await {
                        tracing::error!(%error, "visible-status pass failed");
                    }
                }
                _ = report_tick.tick() => {
                    if let Err(error) = self.reconciler.run_report_pass().await {
                        tracing::error!(%error, "report pass failed");
                    }
                }
                _ = retention_tick.tick() => {
                    if let Err(error) = self.reconciler.run_retention_sweep().await {
                        tracing::error!(%error, "retention sweep failed");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
            }
        }

        tracing::info!("\n{}", self.reconciler.metrics().summary());
    }

    /// Run every pass `cycles` times back to back, without the tickers
    ///
    /// Intended for tests and one-shot invocations.
    pub async fn run_cycles(&mut self, cycles: usize) -> Result<(), SchedulerError> {
        for _ in 0..cycles {
            self.reconciler.run_visible_status_pass().await?;
            self.reconciler.run_report_pass().await?;
            self.reconciler.run_retention_sweep().await?;
        }
        Ok(())
    }
}

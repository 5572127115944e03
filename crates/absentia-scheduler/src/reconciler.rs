//! Reconciliation passes: visible status, retention, and daily reports
//!
//! Each pass re-derives the desired state from the store and converges the
//! outside world toward it. Passes are idempotent, so a crashed or skipped
//! tick is healed by the next one.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use absentia_domain::traits::IntervalStore;
use absentia_domain::{
    timezone, AdapterError, Clock, PlatformAdapter, ReportSchedule, Status, SubjectId, TzScope,
    WorkspaceId,
};
use absentia_report::render_digest;
use chrono::Timelike;
use chrono_tz::Tz;
use tokio::sync::Mutex;

use crate::config::ReconcilerConfig;
use crate::error::SchedulerError;
use crate::metrics::ReconcilerMetrics;
use crate::service::persistence;

/// Converges platform state with stored intervals
///
/// Holds the last-known marker state per subject so a steady-state pass
/// makes no adapter calls. A cache miss means unknown, which forces one
/// converging call; the adapter no-ops when already in the desired state.
pub struct Reconciler<S, A, C> {
    store: Arc<Mutex<S>>,
    adapter: Arc<A>,
    clock: Arc<C>,
    config: ReconcilerConfig,
    metrics: ReconcilerMetrics,
    applied_markers: HashMap<(WorkspaceId, SubjectId), bool>,
}

impl<S, A, C> Reconciler<S, A, C>
where
    S: IntervalStore,
    A: PlatformAdapter,
    C: Clock,
{
    /// Create a reconciler over a shared store, adapter, and clock
    pub fn new(
        store: Arc<Mutex<S>>,
        adapter: Arc<A>,
        clock: Arc<C>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            adapter,
            clock,
            config,
            metrics: ReconcilerMetrics::new(),
            applied_markers: HashMap::new(),
        }
    }

    /// Metrics accumulated since construction (or the last reset)
    pub fn metrics(&self) -> &ReconcilerMetrics {
        &self.metrics
    }

    /// Configuration this reconciler runs with
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Reset accumulated metrics
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Converge visible-absence markers with currently active intervals
    ///
    /// A subject should carry the marker iff at least one of their live
    /// intervals is active now. Adapter failures are logged and retried on
    /// the next tick; they never abort the pass.
    pub async fn run_visible_status_pass(&mut self) -> Result<(), SchedulerError> {
        let now = self.clock.now();

        // Desired marker state per subject, computed under the store lock.
        // A workspace whose rows cannot be read is skipped for this tick;
        // the others still converge.
        let mut desired: Vec<(WorkspaceId, SubjectId, bool)> = Vec::new();
        let mut unreadable: Vec<WorkspaceId> = Vec::new();
        {
            let store = self.store.lock().await;
            for workspace in store.workspace_ids().map_err(persistence)? {
                let intervals = match store.intervals_for_workspace(workspace) {
                    Ok(intervals) => intervals,
                    Err(error) => {
                        tracing::warn!(
                            %workspace,
                            %error,
                            "skipping unreadable workspace this pass"
                        );
                        unreadable.push(workspace);
                        continue;
                    }
                };
                let mut per_subject: HashMap<SubjectId, bool> = HashMap::new();
                for interval in &intervals {
                    let absent = per_subject.entry(interval.subject_id).or_insert(false);
                    *absent = *absent || interval.status_at(now) == Status::Active;
                }
                for (subject, absent) in per_subject {
                    desired.push((workspace, subject, absent));
                }
            }
        }

        // Subjects we marked earlier whose intervals have since vanished
        // (cancelled or purged) still need the marker taken off. Unreadable
        // workspaces are exempt: absence of rows there proves nothing.
        for (&(workspace, subject), &applied) in &self.applied_markers {
            if applied
                && !unreadable.contains(&workspace)
                && !desired
                    .iter()
                    .any(|&(ws, s, _)| ws == workspace && s == subject)
            {
                desired.push((workspace, subject, false));
            }
        }

        for (workspace, subject, want) in desired {
            let key = (workspace, subject);
            if self.applied_markers.get(&key) == Some(&want) {
                continue;
            }
            let call = if want {
                self.adapter.apply_absence_marker(workspace, subject)
            } else {
                self.adapter.remove_absence_marker(workspace, subject)
            };
            match Self::bounded(self.config.adapter_timeout(), call).await {
                Ok(()) => {
                    self.applied_markers.insert(key, want);
                    if want {
                        self.metrics.record_marker_applied();
                    } else {
                        self.metrics.record_marker_removed();
                    }
                }
                Err(error) => {
                    self.metrics.record_marker_failure();
                    tracing::warn!(
                        workspace = %workspace,
                        subject = %subject,
                        %error,
                        "marker call failed, will retry next pass"
                    );
                }
            }
        }

        self.metrics.record_status_pass();
        Ok(())
    }

    /// Delete completed intervals past the retention horizon
    ///
    /// Indefinite intervals have no return instant and are never swept.
    pub async fn run_retention_sweep(&mut self) -> Result<(), SchedulerError> {
        let cutoff = self.clock.now() - self.config.retention_horizon();
        let mut store = self.store.lock().await;

        if self.config.dry_run {
            // Same predicate the live purge uses, cancelled rows included
            let would_purge = store.count_returned_before(cutoff).map_err(persistence)?;
            tracing::info!(%cutoff, would_purge, "dry run: retention sweep skipped");
            self.metrics.record_sweep(0);
            return Ok(());
        }

        let purged = store.purge_returned_before(cutoff).map_err(persistence)?;
        drop(store);

        self.metrics.record_sweep(purged);
        if purged > 0 {
            tracing::info!(%cutoff, purged, "retention sweep deleted old intervals");
        }
        Ok(())
    }

    /// Dispatch due daily digests
    ///
    /// A schedule is due when the workspace-local hour has reached
    /// `report_hour` and no dispatch has been recorded for the current
    /// local day. `last_sent_at` is only advanced on a successful send, so
    /// a failed dispatch is retried on the next tick.
    pub async fn run_report_pass(&mut self) -> Result<(), SchedulerError> {
        let now = self.clock.now();

        // Snapshot everything needed for rendering under one lock hold.
        // A schedule whose workspace cannot be read is skipped for this
        // tick without blocking the other due workspaces.
        let mut due: Vec<(ReportSchedule, Tz, Vec<absentia_domain::AbsenceInterval>)> = Vec::new();
        {
            let store = self.store.lock().await;
            for schedule in store.enabled_report_schedules().map_err(persistence)? {
                let workspace = schedule.workspace_id;
                let binding = match store.timezone_binding(&TzScope::Workspace(workspace)) {
                    Ok(binding) => binding,
                    Err(error) => {
                        tracing::warn!(%workspace, %error, "skipping schedule this pass");
                        continue;
                    }
                };
                let tz = timezone::resolve(None, None, binding.as_deref())?;

                let local = now.with_timezone(&tz);
                if (local.hour() as u8) < schedule.report_hour {
                    continue;
                }
                if let Some(last) = schedule.last_sent_at {
                    if last.with_timezone(&tz).date_naive() == local.date_naive() {
                        continue;
                    }
                }

                let intervals = match store.intervals_for_workspace(workspace) {
                    Ok(intervals) => intervals,
                    Err(error) => {
                        tracing::warn!(%workspace, %error, "skipping schedule this pass");
                        continue;
                    }
                };
                due.push((schedule, tz, intervals));
            }
        }

        for (schedule, _tz, intervals) in due {
            let workspace = schedule.workspace_id;
            let names = self.display_names(workspace, &intervals).await;
            let body = render_digest(&intervals, &names, now);

            let send = self.adapter.send_report(workspace, schedule.channel, &body);
            match Self::bounded(self.config.adapter_timeout(), send).await {
                Ok(()) => {
                    self.metrics.record_report_sent();
                    tracing::info!(%workspace, "daily digest dispatched");
                    // The digest went out; a failure to persist the dispatch
                    // instant must not block the remaining workspaces. Worst
                    // case the next tick re-sends this one digest.
                    let mut store = self.store.lock().await;
                    if let Err(error) = store.record_report_dispatch(workspace, now) {
                        tracing::error!(%workspace, %error, "failed to record dispatch instant");
                    }
                }
                Err(error) => {
                    self.metrics.record_report_failure();
                    tracing::warn!(%workspace, %error, "digest dispatch failed, will retry");
                }
            }
        }

        self.metrics.record_report_pass();
        Ok(())
    }

    async fn display_names(
        &self,
        workspace: WorkspaceId,
        intervals: &[absentia_domain::AbsenceInterval],
    ) -> HashMap<SubjectId, String> {
        let mut names = HashMap::new();
        for interval in intervals {
            if names.contains_key(&interval.subject_id) {
                continue;
            }
            if let Some(name) = self
                .adapter
                .display_name(workspace, interval.subject_id)
                .await
            {
                names.insert(interval.subject_id, name);
            }
        }
        names
    }

    async fn bounded<F>(limit: std::time::Duration, call: F) -> Result<(), SchedulerError>
    where
        F: Future<Output = Result<(), AdapterError>>,
    {
        match tokio::time::timeout(limit, call).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(SchedulerError::Adapter(error.to_string())),
            Err(_) => Err(SchedulerError::Adapter("call timed out".to_string())),
        }
    }
}

//! Metrics collection for reconciliation passes

/// Counters collected across reconciliation passes
///
/// Tracks marker changes, purged intervals, and report dispatches for
/// observability; failures are counted, never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilerMetrics {
    /// Visible-status passes completed
    pub status_passes: usize,

    /// Absence markers applied
    pub markers_applied: usize,

    /// Absence markers removed
    pub markers_removed: usize,

    /// Marker calls that failed or timed out (skipped until the next tick)
    pub marker_failures: usize,

    /// Retention sweeps completed
    pub retention_sweeps: usize,

    /// Intervals deleted by retention sweeps
    pub intervals_purged: usize,

    /// Report passes completed
    pub report_passes: usize,

    /// Digests dispatched
    pub reports_sent: usize,

    /// Digest dispatches that failed or timed out
    pub report_failures: usize,
}

impl ReconcilerMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed visible-status pass
    pub fn record_status_pass(&mut self) {
        self.status_passes += 1;
    }

    /// Record an applied marker
    pub fn record_marker_applied(&mut self) {
        self.markers_applied += 1;
    }

    /// Record a removed marker
    pub fn record_marker_removed(&mut self) {
        self.markers_removed += 1;
    }

    /// Record a failed marker call
    pub fn record_marker_failure(&mut self) {
        self.marker_failures += 1;
    }

    /// Record a completed retention sweep and its deletion count
    pub fn record_sweep(&mut self, purged: usize) {
        self.retention_sweeps += 1;
        self.intervals_purged += purged;
    }

    /// Record a completed report pass
    pub fn record_report_pass(&mut self) {
        self.report_passes += 1;
    }

    /// Record a dispatched digest
    pub fn record_report_sent(&mut self) {
        self.reports_sent += 1;
    }

    /// Record a failed digest dispatch
    pub fn record_report_failure(&mut self) {
        self.report_failures += 1;
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        [
            "Reconciler Metrics Summary".to_string(),
            "==========================".to_string(),
            format!(
                "Status passes: {} ({} applied, {} removed, {} failed)",
                self.status_passes,
                self.markers_applied,
                self.markers_removed,
                self.marker_failures
            ),
            format!(
                "Retention sweeps: {} ({} purged)",
                self.retention_sweeps, self.intervals_purged
            ),
            format!(
                "Report passes: {} ({} sent, {} failed)",
                self.report_passes, self.reports_sent, self.report_failures
            ),
        ]
        .join("\n")
    }
}

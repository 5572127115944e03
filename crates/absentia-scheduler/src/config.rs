//! Configuration for the reconciliation scheduler
//!
//! Defines pass cadences, the retention horizon, and adapter timeouts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the reconciler and its background worker
///
/// # Examples
///
/// ```
/// use absentia_scheduler::ReconcilerConfig;
///
/// let config = ReconcilerConfig::default();
/// assert_eq!(config.status_interval_minutes, 5);
/// assert_eq!(config.retention_days, 90);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// How often the visible-status pass runs (in minutes)
    /// Default: every 5 minutes
    pub status_interval_minutes: u64,

    /// How often the report pass checks schedules (in minutes)
    /// Default: every 60 minutes (hourly)
    pub report_interval_minutes: u64,

    /// How often the retention sweep runs (in hours)
    /// Default: every 24 hours
    pub retention_interval_hours: u64,

    /// Retention horizon: completed intervals whose return instant is older
    /// than this many days are deleted
    /// Default: 90 days
    pub retention_days: i64,

    /// Upper bound for a single adapter call (marker apply, message send),
    /// in seconds; expiry is treated as a recoverable failure
    /// Default: 10 seconds
    pub adapter_timeout_secs: u64,

    /// Dry-run mode: log what the retention sweep would delete without
    /// actually deleting
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            status_interval_minutes: 5,
            report_interval_minutes: 60,
            retention_interval_hours: 24,
            retention_days: 90,
            adapter_timeout_secs: 10,
            dry_run: false,
        }
    }
}

impl ReconcilerConfig {
    /// Visible-status pass cadence as Duration
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_minutes * 60)
    }

    /// Report pass cadence as Duration
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_minutes * 60)
    }

    /// Retention sweep cadence as Duration
    pub fn retention_interval(&self) -> Duration {
        Duration::from_secs(self.retention_interval_hours * 3600)
    }

    /// Adapter call timeout as Duration
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }

    /// Retention horizon as a chrono Duration
    pub fn retention_horizon(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }
}

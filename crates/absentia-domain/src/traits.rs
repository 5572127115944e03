//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the temporal core and
//! infrastructure. Implementations live in other crates (absentia-store for
//! persistence, the platform bot for the adapter).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AdapterError;
use crate::interval::{AbsenceInterval, ChannelId, IntervalId, SubjectId, WorkspaceId};
use crate::schedule::{ReportSchedule, TzScope};

/// Persistence interface for intervals, timezone bindings, and schedules
///
/// Implemented by the infrastructure layer (absentia-store). Query methods
/// for intervals exclude cancelled (soft-deleted) rows.
pub trait IntervalStore {
    /// Error type for store operations
    type Error: std::fmt::Display;

    /// Persist a newly created interval
    fn insert_interval(&mut self, interval: AbsenceInterval) -> Result<(), Self::Error>;

    /// Fetch one interval by id, including cancelled ones
    fn interval(&self, id: IntervalId) -> Result<Option<AbsenceInterval>, Self::Error>;

    /// Persist edited bounds/reason for an existing interval
    fn update_interval(&mut self, interval: &AbsenceInterval) -> Result<(), Self::Error>;

    /// Soft-delete an interval; returns whether a live row was cancelled
    fn cancel_interval(&mut self, id: IntervalId, at: DateTime<Utc>) -> Result<bool, Self::Error>;

    /// All non-cancelled intervals for one subject in one workspace
    fn intervals_for_subject(
        &self,
        workspace: WorkspaceId,
        subject: SubjectId,
    ) -> Result<Vec<AbsenceInterval>, Self::Error>;

    /// All non-cancelled intervals in one workspace
    fn intervals_for_workspace(
        &self,
        workspace: WorkspaceId,
    ) -> Result<Vec<AbsenceInterval>, Self::Error>;

    /// Distinct workspaces that have at least one non-cancelled interval
    fn workspace_ids(&self) -> Result<Vec<WorkspaceId>, Self::Error>;

    /// Irreversibly delete intervals whose return instant is before `cutoff`
    ///
    /// Indefinite intervals have no return instant and are never matched.
    /// Cancelled rows with an old return instant are matched. Returns the
    /// number of rows deleted.
    fn purge_returned_before(&mut self, cutoff: DateTime<Utc>) -> Result<usize, Self::Error>;

    /// Number of rows a [`purge_returned_before`](Self::purge_returned_before)
    /// at `cutoff` would delete, under the same predicate
    fn count_returned_before(&self, cutoff: DateTime<Utc>) -> Result<usize, Self::Error>;

    /// Stored timezone identifier for a scope, if any
    fn timezone_binding(&self, scope: &TzScope) -> Result<Option<String>, Self::Error>;

    /// Set or replace the timezone binding for a scope
    fn set_timezone_binding(&mut self, scope: &TzScope, timezone: &str)
        -> Result<(), Self::Error>;

    /// Report schedule for a workspace, if configured
    fn report_schedule(&self, workspace: WorkspaceId)
        -> Result<Option<ReportSchedule>, Self::Error>;

    /// Create or replace a workspace's report schedule
    fn set_report_schedule(&mut self, schedule: &ReportSchedule) -> Result<(), Self::Error>;

    /// All schedules with the enabled flag set
    fn enabled_report_schedules(&self) -> Result<Vec<ReportSchedule>, Self::Error>;

    /// Record a successful digest dispatch for re-fire suppression
    fn record_report_dispatch(
        &mut self,
        workspace: WorkspaceId,
        at: DateTime<Utc>,
    ) -> Result<(), Self::Error>;
}

/// Platform adapter: visible-absence markers, messaging, name resolution
///
/// The adapter is expected to no-op when a marker is already in the desired
/// state; the scheduler additionally diffs against last-known-applied state
/// to avoid redundant calls.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Apply the visible-absence marker (role + nickname prefix) to a subject
    async fn apply_absence_marker(
        &self,
        workspace: WorkspaceId,
        subject: SubjectId,
    ) -> Result<(), AdapterError>;

    /// Remove the visible-absence marker from a subject
    async fn remove_absence_marker(
        &self,
        workspace: WorkspaceId,
        subject: SubjectId,
    ) -> Result<(), AdapterError>;

    /// Send a message to a channel, or the workspace default when `None`
    async fn send_report(
        &self,
        workspace: WorkspaceId,
        channel: Option<ChannelId>,
        body: &str,
    ) -> Result<(), AdapterError>;

    /// Resolve a subject to a display name; `None` when unresolvable
    async fn display_name(&self, workspace: WorkspaceId, subject: SubjectId) -> Option<String>;
}

/// Source of the current absolute instant
///
/// Behind a trait so tests can pin or advance time.
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

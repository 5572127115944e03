//! Timezone bindings and per-workspace report schedules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interval::{ChannelId, SubjectId, WorkspaceId};

/// Scope of a timezone binding
///
/// Bindings map an entity to a canonical timezone identifier. They are
/// mutated only by explicit configuration actions and are read-only to the
/// temporal core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TzScope {
    /// Workspace-level default timezone
    Workspace(WorkspaceId),

    /// A subject's timezone within one workspace
    Subject(WorkspaceId, SubjectId),
}

impl TzScope {
    /// Scope discriminator for keyed storage
    pub fn scope_type(&self) -> &'static str {
        match self {
            TzScope::Workspace(_) => "workspace",
            TzScope::Subject(_, _) => "subject",
        }
    }

    /// Scope key for keyed storage
    pub fn scope_key(&self) -> String {
        match self {
            TzScope::Workspace(ws) => ws.to_string(),
            TzScope::Subject(ws, subject) => format!("{}:{}", ws, subject),
        }
    }
}

/// Per-workspace daily digest schedule
///
/// Defaults to disabled. `report_hour` is interpreted in the workspace's
/// resolved timezone; `last_sent_at` is persisted so a process restart
/// neither duplicates nor drops a dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSchedule {
    /// Workspace this schedule belongs to
    pub workspace_id: WorkspaceId,

    /// Whether the daily digest fires at all
    pub enabled: bool,

    /// Target channel; `None` falls back to the workspace's default
    /// absence channel
    pub channel: Option<ChannelId>,

    /// Local hour of day (0-23) the digest is due
    pub report_hour: u8,

    /// Last successful dispatch (UTC)
    pub last_sent_at: Option<DateTime<Utc>>,
}

impl ReportSchedule {
    /// Default hour of day for new schedules
    pub const DEFAULT_REPORT_HOUR: u8 = 8;

    /// New disabled schedule with the default hour
    pub fn new(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            enabled: false,
            channel: None,
            report_hour: Self::DEFAULT_REPORT_HOUR,
            last_sent_at: None,
        }
    }
}

//! Absence interval model - the fundamental unit of Absentia

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::status::Status;

/// Unique identifier for an absence interval based on UUIDv7
///
/// UUIDv7 provides chronological sortability, 128-bit uniqueness, and
/// coordination-free generation, so ids are never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct IntervalId(uuid::Uuid);

impl IntervalId {
    /// Generate a new UUIDv7-based id
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Reconstruct an id from raw bytes (storage layer deserialization)
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Uuid::from_bytes(bytes))
    }

    /// Parse an id from its string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("invalid interval id: {}", e))
    }

    /// Raw bytes for storage
    pub fn as_bytes(&self) -> [u8; 16] {
        *self.0.as_bytes()
    }
}

impl Default for IntervalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IntervalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an isolated tenant workspace (guild/server)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WorkspaceId(pub u64);

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a workspace member
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SubjectId(pub u64);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message channel inside a workspace
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A member absence interval, scoped to one workspace
///
/// Treated everywhere as the half-open range `[leave_at, return_at)`, or
/// `[leave_at, +inf)` when `return_at` is absent (indefinite absence).
/// All instants are UTC; `source_timezone` is retained so the interval can
/// be redisplayed in the author's original local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsenceInterval {
    /// Unique identifier, assigned at creation, immutable
    pub id: IntervalId,

    /// Member the interval applies to
    pub subject_id: SubjectId,

    /// Containing workspace (a member may have independent intervals per workspace)
    pub workspace_id: WorkspaceId,

    /// When absence begins (UTC)
    pub leave_at: DateTime<Utc>,

    /// When absence ends (UTC), or `None` for an indefinite absence
    pub return_at: Option<DateTime<Utc>>,

    /// Optional free-form reason
    pub reason: Option<String>,

    /// Canonical IANA timezone the interval was authored in
    pub source_timezone: String,

    /// Acting subject (self or a delegate) - provenance only
    pub created_by: SubjectId,

    /// Creation instant, set once
    pub created_at: DateTime<Utc>,

    /// Soft-delete marker; cancelled intervals are ignored by overlap
    /// checks, reconciliation, and reports
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl AbsenceInterval {
    /// Whether this interval has been cancelled (soft-deleted)
    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }

    /// Whether this interval overlaps the candidate half-open range
    ///
    /// Two ranges overlap iff each starts before the other's effective end,
    /// where an absent return substitutes +infinity. Touching boundaries
    /// (return at T, new leave at T) are adjacent, not overlapping.
    pub fn overlaps_range(
        &self,
        leave: DateTime<Utc>,
        return_at: Option<DateTime<Utc>>,
    ) -> bool {
        ranges_overlap(self.leave_at, self.return_at, leave, return_at)
    }

    /// Point-in-time status against an absolute `now`
    pub fn status_at(&self, now: DateTime<Utc>) -> Status {
        Status::classify(self.leave_at, self.return_at, now)
    }

    /// Whole-day duration, or `None` for an indefinite interval
    pub fn duration_days(&self) -> Option<i64> {
        self.return_at
            .map(|r| r.signed_duration_since(self.leave_at).num_days())
    }
}

/// Overlap predicate for two half-open ranges with optional open ends
pub fn ranges_overlap(
    a_start: DateTime<Utc>,
    a_end: Option<DateTime<Utc>>,
    b_start: DateTime<Utc>,
    b_end: Option<DateTime<Utc>>,
) -> bool {
    let b_starts_before_a_ends = match a_end {
        Some(end) => b_start < end,
        None => true,
    };
    let a_starts_before_b_ends = match b_end {
        Some(end) => a_start < end,
        None => true,
    };
    b_starts_before_a_ends && a_starts_before_b_ends
}

/// Validate interval bounds: a present return must be strictly after leave
pub fn validate_bounds(
    leave: DateTime<Utc>,
    return_at: Option<DateTime<Utc>>,
) -> Result<(), crate::error::DomainError> {
    if let Some(ret) = return_at {
        if ret <= leave {
            return Err(crate::error::DomainError::InvalidInterval(format!(
                "return instant {} is not after leave instant {}",
                ret, leave
            )));
        }
    }
    Ok(())
}

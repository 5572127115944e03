//! Status classification - point-in-time state of an absence interval

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time classification of an absence interval
///
/// Evaluated against an absolute `now`: the lower bound is inclusive
/// (absence starts the instant `leave` arrives), the upper bound exclusive
/// (the member is back the instant `return` arrives).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Absence has not started yet (`now < leave`)
    Scheduled,

    /// Absence is underway (`leave <= now` and no return bound reached)
    Active,

    /// Absence has ended (`now >= return`)
    Completed,
}

impl Status {
    /// Classify a half-open `[leave, return)` range at `now`
    ///
    /// Pure function of the bounds and the instant; no side effects.
    pub fn classify(
        leave: DateTime<Utc>,
        return_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        if now < leave {
            Status::Scheduled
        } else if return_at.map_or(true, |ret| now < ret) {
            Status::Active
        } else {
            Status::Completed
        }
    }

    /// Status name as a display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Scheduled => "Scheduled",
            Status::Active => "Active",
            Status::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

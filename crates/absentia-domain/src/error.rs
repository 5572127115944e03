//! Typed errors for the temporal core

use crate::interval::IntervalId;
use thiserror::Error;

/// Errors surfaced by the domain layer to create/edit callers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Explicit timezone input that matched neither an IANA name nor an alias
    #[error("unrecognized timezone: {0}")]
    InvalidTimezone(String),

    /// Malformed or non-positive-duration interval bounds
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// Candidate interval overlaps an existing non-cancelled one
    ///
    /// Carries the conflicting interval's id so the caller can present it.
    #[error("interval overlaps existing absence {conflicting}")]
    OverlapConflict {
        /// Id of the interval the candidate collided with
        conflicting: IntervalId,
    },
}

/// Errors returned by the platform adapter (marker apply, message dispatch)
///
/// All adapter failures are recoverable: the reconciliation cadence is the
/// retry mechanism, so callers log and skip rather than abort.
#[derive(Error, Debug, Clone)]
pub enum AdapterError {
    /// The platform call failed or the endpoint was unreachable
    #[error("adapter unavailable: {0}")]
    Unavailable(String),

    /// The platform rejected the call (e.g. missing permission)
    #[error("adapter denied: {0}")]
    Denied(String),
}

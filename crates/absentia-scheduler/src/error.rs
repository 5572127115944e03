//! Error types for scheduler operations

use absentia_domain::DomainError;
use thiserror::Error;

/// Errors surfaced by the mutation service and the reconciliation passes
///
/// Nothing here is process-fatal: persistence failures abort only the
/// current unit of work, and adapter failures are retried by the next
/// scheduled tick.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Validation, timezone, or overlap-conflict error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Storage layer failure for the current unit of work
    #[error("persistence unavailable: {0}")]
    Persistence(String),

    /// Platform adapter call failed or timed out
    #[error("adapter unavailable: {0}")]
    Adapter(String),
}

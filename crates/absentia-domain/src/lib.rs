//! Absentia Domain Layer
//!
//! This crate contains the temporal core of Absentia: the absence interval
//! model, the overlap-conflict rule, the status classifier, and the timezone
//! resolver. It defines the trait interfaces that the infrastructure layers
//! (store, platform adapter, clock) implement.
//!
//! ## Key Concepts
//!
//! - **AbsenceInterval**: a single non-recurring absence span, half-open
//!   `[leave, return)`, with an optional open (indefinite) end
//! - **Status**: point-in-time classification (scheduled / active / completed)
//! - **Timezone resolution**: explicit input → subject binding → workspace
//!   binding → UTC, with a free-form alias table in front of the IANA database
//! - **Trait seams**: persistence, platform adapter, and clock live behind
//!   traits so the core stays pure and testable
//!
//! ## Architecture
//!
//! All stored instants are UTC. Canonical timezones are retained per interval
//! only for redisplay and for computing local calendar-day boundaries in
//! report windows. Everything in this crate is side-effect free; the
//! scheduler crate drives external state from these functions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod interval;
pub mod schedule;
pub mod status;
pub mod timezone;
pub mod traits;

// Re-exports for convenience
pub use error::{AdapterError, DomainError};
pub use interval::{AbsenceInterval, ChannelId, IntervalId, SubjectId, WorkspaceId};
pub use schedule::{ReportSchedule, TzScope};
pub use status::Status;
pub use traits::{Clock, IntervalStore, PlatformAdapter, SystemClock};

//! Reconciliation scheduler and mutation service for absence intervals
//!
//! This crate ties the temporal core to the outside world:
//!
//! - [`IntervalService`] — the entry points the presentation layer calls:
//!   create, edit, cancel, digest listing, export
//! - [`Reconciler`] — the three periodic passes (visible status, retention,
//!   daily reports) that converge platform state with the store
//! - [`ReconcilerWorker`] — the background task driving the passes on their
//!   configured cadences
//!
//! The service and the reconciler share one `tokio::sync::Mutex` around the
//! store, which serializes mutations against reconciliation reads. Adapter
//! calls are made outside the lock and bounded by a timeout.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod reconciler;
pub mod service;
pub mod worker;

#[cfg(test)]
mod testutil;

pub use config::ReconcilerConfig;
pub use error::SchedulerError;
pub use metrics::ReconcilerMetrics;
pub use reconciler::Reconciler;
pub use service::{CreateInterval, EditInterval, IntervalService};
pub use worker::ReconcilerWorker;

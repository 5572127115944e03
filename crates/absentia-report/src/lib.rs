//! Absentia Report Layer
//!
//! Pure projections over queried absence intervals: the daily digest text
//! and the tabular CSV export. No side effects and no store access; the
//! caller supplies the intervals, resolved display names, and `now`.

#![warn(missing_docs)]

pub mod digest;
pub mod export;

pub use digest::{digest_entries, render_digest, DIGEST_WINDOW_DAYS};
pub use export::{render_export, to_csv, ExportRow};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Display format for localized instants, shared by digest and export
pub(crate) const LOCAL_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Render an instant in the interval's authored timezone
///
/// A stored timezone that no longer parses falls back to UTC rather than
/// failing a whole report.
pub(crate) fn format_local(instant: DateTime<Utc>, timezone: &str) -> String {
    let tz: Tz = timezone.parse().unwrap_or(Tz::UTC);
    instant.with_timezone(&tz).format(LOCAL_FORMAT).to_string()
}

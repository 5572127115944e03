//! Timezone normalization and resolution
//!
//! Free-form input ("NZT", "Sydney", "Pacific/Auckland") is normalized to a
//! canonical IANA timezone. Resolution for a subject layers explicit input
//! over the subject's binding, the workspace's binding, and a UTC fallback.
//! Resolution is pure: no network or filesystem access, and only explicit
//! invalid input ever fails.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::DomainError;

/// Map a friendly alias (uppercased) to its IANA name
///
/// This is config data, not control flow: abbreviations and city names
/// commonly typed by members, kept deliberately small.
fn alias_to_iana(alias: &str) -> Option<&'static str> {
    match alias {
        // New Zealand
        "NZT" | "NZDT" | "AUCKLAND" => Some("Pacific/Auckland"),
        // Australia
        "AEST" | "AEDT" | "SYDNEY" => Some("Australia/Sydney"),
        "MELBOURNE" => Some("Australia/Melbourne"),
        "BRISBANE" => Some("Australia/Brisbane"),
        "PERTH" => Some("Australia/Perth"),
        // North America
        "EST" | "EDT" => Some("America/New_York"),
        "PST" | "PDT" => Some("America/Los_Angeles"),
        "CST" | "CDT" => Some("America/Chicago"),
        // Europe
        "GMT" | "BST" | "LONDON" => Some("Europe/London"),
        "CET" | "CEST" => Some("Europe/Berlin"),
        _ => None,
    }
}

/// Normalize free-form timezone input to a canonical timezone
///
/// Input containing `/` is validated directly against the IANA database;
/// anything else goes through the alias table. Returns `None` for
/// unrecognized input.
///
/// # Examples
///
/// ```
/// use absentia_domain::timezone::normalize;
/// use chrono_tz::Tz;
///
/// assert_eq!(normalize("Pacific/Auckland"), Some(Tz::Pacific__Auckland));
/// assert_eq!(normalize("nzt"), Some(Tz::Pacific__Auckland));
/// assert_eq!(normalize("Atlantis/Lost"), None);
/// ```
pub fn normalize(input: &str) -> Option<Tz> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains('/') {
        return trimmed.parse::<Tz>().ok();
    }
    alias_to_iana(&trimmed.to_uppercase())?.parse::<Tz>().ok()
}

/// Resolve the effective timezone for a subject in a workspace
///
/// Precedence, first match wins:
/// 1. explicit `raw` input (unknown input is `InvalidTimezone`, never
///    silently defaulted)
/// 2. the subject's stored binding
/// 3. the workspace's stored binding
/// 4. UTC
///
/// Stored bindings that no longer validate fall through to the next step,
/// so only step 1 can fail.
pub fn resolve(
    raw: Option<&str>,
    subject_binding: Option<&str>,
    workspace_binding: Option<&str>,
) -> Result<Tz, DomainError> {
    if let Some(raw) = raw {
        return normalize(raw).ok_or_else(|| DomainError::InvalidTimezone(raw.to_string()));
    }
    if let Some(tz) = subject_binding.and_then(normalize) {
        return Ok(tz);
    }
    if let Some(tz) = workspace_binding.and_then(normalize) {
        return Ok(tz);
    }
    Ok(Tz::UTC)
}

/// Anchor a naive local datetime in `tz` and convert to UTC
///
/// DST-ambiguous times take the earliest mapping; times skipped by a
/// spring-forward transition are rejected as `InvalidInterval`.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>, DomainError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(DomainError::InvalidInterval(format!(
            "local time {} does not exist in {}",
            naive, tz
        ))),
    }
}

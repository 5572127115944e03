//! Daily digest rendering

use absentia_domain::{AbsenceInterval, Status, SubjectId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::format_local;

/// How far ahead the digest looks for scheduled absences
pub const DIGEST_WINDOW_DAYS: i64 = 7;

/// Select the intervals a digest at `now` should show
///
/// Active intervals, plus Scheduled ones leaving within the next
/// [`DIGEST_WINDOW_DAYS`] days; cancelled intervals are skipped. Returned
/// ascending by leave instant.
pub fn digest_entries(
    intervals: &[AbsenceInterval],
    now: DateTime<Utc>,
) -> Vec<&AbsenceInterval> {
    let horizon = now + Duration::days(DIGEST_WINDOW_DAYS);
    let mut entries: Vec<&AbsenceInterval> = intervals
        .iter()
        .filter(|interval| !interval.is_cancelled())
        .filter(|interval| match interval.status_at(now) {
            Status::Active => true,
            Status::Scheduled => interval.leave_at < horizon,
            Status::Completed => false,
        })
        .collect();
    entries.sort_by_key(|interval| interval.leave_at);
    entries
}

/// Render the digest text for one workspace
///
/// Leave/return instants are redisplayed in each interval's authored
/// timezone, not the report's. An empty selection renders an explicit
/// "no absences" message rather than an empty body.
pub fn render_digest(
    intervals: &[AbsenceInterval],
    names: &HashMap<SubjectId, String>,
    now: DateTime<Utc>,
) -> String {
    let entries = digest_entries(intervals, now);

    if entries.is_empty() {
        return format!(
            "📊 **Daily Absence Report**\n\nNo active or upcoming absences for the next {} days.",
            DIGEST_WINDOW_DAYS
        );
    }

    let mut lines = vec![
        "📊 **Daily Absence Report**".to_string(),
        format!(
            "Showing absences active or starting within the next {} days.\n",
            DIGEST_WINDOW_DAYS
        ),
    ];

    for interval in entries {
        let who = names
            .get(&interval.subject_id)
            .cloned()
            .unwrap_or_else(|| format!("Member {}", interval.subject_id));
        let leave = format_local(interval.leave_at, &interval.source_timezone);
        let ret = match interval.return_at {
            Some(ret) => format_local(ret, &interval.source_timezone),
            None => "Until further notice".to_string(),
        };
        let reason = interval.reason.as_deref().unwrap_or("No reason provided");

        lines.push(format!("• {}: {} → {}", who, leave, ret));
        lines.push(format!("  *Reason:* {}", reason));
    }

    lines.join("\n")
}

//! Tabular export rendering

use absentia_domain::{AbsenceInterval, SubjectId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::format_local;

/// Placeholder for subjects the platform could not resolve
const UNKNOWN: &str = "unknown";

/// One export row: a flat projection of a single interval
///
/// Status and duration are derived columns; re-ingestion reconstructs an
/// interval from the remaining fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    /// Subject id as text
    pub subject_id: String,
    /// Resolved display name, or "unknown"
    pub display_name: String,
    /// Leave instant in the interval's authored timezone
    pub leave_at: String,
    /// Return instant in the authored timezone, or "indefinite"
    pub return_at: String,
    /// Reason, blank when absent
    pub reason: String,
    /// Computed status at export time
    pub status: String,
    /// Canonical timezone the interval was authored in
    pub timezone: String,
    /// Creation instant in the authored timezone
    pub created_at: String,
    /// Whole-day duration, or "indefinite"
    pub duration_days: String,
    /// "self", or the delegate's display name
    pub created_by: String,
}

impl ExportRow {
    /// Column headers, in field order
    pub const HEADERS: [&'static str; 10] = [
        "Subject ID",
        "Display Name",
        "Leave",
        "Return",
        "Reason",
        "Status",
        "Timezone",
        "Created At",
        "Days Away",
        "Created By",
    ];

    fn fields(&self) -> [&str; 10] {
        [
            &self.subject_id,
            &self.display_name,
            &self.leave_at,
            &self.return_at,
            &self.reason,
            &self.status,
            &self.timezone,
            &self.created_at,
            &self.duration_days,
            &self.created_by,
        ]
    }
}

/// Project every non-cancelled interval to an export row
///
/// One row per interval regardless of status, ascending by leave instant.
/// Pure: display names are resolved by the caller and passed in; a missing
/// name renders the "unknown" sentinel.
pub fn render_export(
    intervals: &[AbsenceInterval],
    names: &HashMap<SubjectId, String>,
    now: DateTime<Utc>,
) -> Vec<ExportRow> {
    let mut live: Vec<&AbsenceInterval> = intervals
        .iter()
        .filter(|interval| !interval.is_cancelled())
        .collect();
    live.sort_by_key(|interval| interval.leave_at);

    live.iter()
        .map(|interval| {
            let provenance = if interval.created_by == interval.subject_id {
                "self".to_string()
            } else {
                names
                    .get(&interval.created_by)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN.to_string())
            };

            ExportRow {
                subject_id: interval.subject_id.to_string(),
                display_name: names
                    .get(&interval.subject_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                leave_at: format_local(interval.leave_at, &interval.source_timezone),
                return_at: match interval.return_at {
                    Some(ret) => format_local(ret, &interval.source_timezone),
                    None => "indefinite".to_string(),
                },
                reason: interval.reason.clone().unwrap_or_default(),
                status: interval.status_at(now).to_string(),
                timezone: interval.source_timezone.clone(),
                created_at: format_local(interval.created_at, &interval.source_timezone),
                duration_days: match interval.duration_days() {
                    Some(days) => days.to_string(),
                    None => "indefinite".to_string(),
                },
                created_by: provenance,
            }
        })
        .collect()
}

/// Serialize rows to an RFC 4180 CSV table with a header line
pub fn to_csv(rows: &[ExportRow]) -> String {
    let mut out = String::new();
    push_record(&mut out, &ExportRow::HEADERS);
    for row in rows {
        push_record(&mut out, &row.fields());
    }
    out
}

fn push_record(out: &mut String, fields: &[&str; 10]) {
    let escaped: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    out.push_str(&escaped.join(","));
    out.push('\n');
}

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

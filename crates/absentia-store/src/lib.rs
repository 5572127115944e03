//! Absentia Storage Layer
//!
//! Implements the IntervalStore trait over SQLite.
//!
//! # Architecture
//!
//! - One table for absence intervals, indexed by (workspace, subject)
//! - Keyed tables for timezone bindings and report schedules
//! - Instants stored as RFC 3339 UTC text, ids as 16-byte UUID blobs
//!
//! # Examples
//!
//! ```no_run
//! use absentia_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for interval operations
//! ```

#![warn(missing_docs)]

use absentia_domain::traits::IntervalStore;
use absentia_domain::{
    AbsenceInterval, ChannelId, IntervalId, ReportSchedule, SubjectId, TzScope, WorkspaceId,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format in a stored row
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// SQLite-based implementation of IntervalStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. The scheduler serializes all
/// access behind a single lock, so one store instance is shared through it.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore at the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.conn.execute_batch(include_str!("schema.sql"))?;
        Ok(store)
    }

    fn instant_to_text(instant: DateTime<Utc>) -> String {
        instant.to_rfc3339()
    }

    fn text_to_instant(text: &str) -> Result<DateTime<Utc>, StoreError> {
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::InvalidData(format!("bad instant {:?}: {}", text, e)))
    }

    fn row_to_interval(row: &Row<'_>) -> Result<AbsenceInterval, StoreError> {
        let id_bytes: Vec<u8> = row.get("id")?;
        let id_bytes: [u8; 16] = id_bytes.try_into().map_err(|b: Vec<u8>| {
            StoreError::InvalidData(format!("expected 16-byte id, got {} bytes", b.len()))
        })?;

        let leave_at: String = row.get("leave_at")?;
        let return_at: Option<String> = row.get("return_at")?;
        let created_at: String = row.get("created_at")?;
        let cancelled_at: Option<String> = row.get("cancelled_at")?;

        Ok(AbsenceInterval {
            id: IntervalId::from_bytes(id_bytes),
            workspace_id: WorkspaceId(row.get::<_, i64>("workspace_id")? as u64),
            subject_id: SubjectId(row.get::<_, i64>("subject_id")? as u64),
            leave_at: Self::text_to_instant(&leave_at)?,
            return_at: return_at.as_deref().map(Self::text_to_instant).transpose()?,
            reason: row.get("reason")?,
            source_timezone: row.get("source_timezone")?,
            created_by: SubjectId(row.get::<_, i64>("created_by")? as u64),
            created_at: Self::text_to_instant(&created_at)?,
            cancelled_at: cancelled_at
                .as_deref()
                .map(Self::text_to_instant)
                .transpose()?,
        })
    }

    fn row_to_schedule(row: &Row<'_>) -> Result<ReportSchedule, StoreError> {
        let last_sent_at: Option<String> = row.get("last_sent_at")?;
        Ok(ReportSchedule {
            workspace_id: WorkspaceId(row.get::<_, i64>("workspace_id")? as u64),
            enabled: row.get("enabled")?,
            channel: row
                .get::<_, Option<i64>>("channel_id")?
                .map(|c| ChannelId(c as u64)),
            report_hour: row.get::<_, i64>("report_hour")? as u8,
            last_sent_at: last_sent_at
                .as_deref()
                .map(Self::text_to_instant)
                .transpose()?,
        })
    }
}

const INTERVAL_COLUMNS: &str = "id, workspace_id, subject_id, leave_at, return_at, reason, \
     source_timezone, created_by, created_at, cancelled_at";

impl IntervalStore for SqliteStore {
    type Error = StoreError;

    fn insert_interval(&mut self, interval: AbsenceInterval) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO absence_intervals \
             (id, workspace_id, subject_id, leave_at, return_at, reason, \
              source_timezone, created_by, created_at, cancelled_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                interval.id.as_bytes().to_vec(),
                interval.workspace_id.0 as i64,
                interval.subject_id.0 as i64,
                Self::instant_to_text(interval.leave_at),
                interval.return_at.map(Self::instant_to_text),
                interval.reason,
                interval.source_timezone,
                interval.created_by.0 as i64,
                Self::instant_to_text(interval.created_at),
                interval.cancelled_at.map(Self::instant_to_text),
            ],
        )?;
        Ok(())
    }

    fn interval(&self, id: IntervalId) -> Result<Option<AbsenceInterval>, Self::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM absence_intervals WHERE id = ?1",
            INTERVAL_COLUMNS
        ))?;
        let row = stmt
            .query_row(params![id.as_bytes().to_vec()], |row| {
                Ok(Self::row_to_interval(row))
            })
            .optional()?;
        row.transpose()
    }

    fn update_interval(&mut self, interval: &AbsenceInterval) -> Result<(), Self::Error> {
        self.conn.execute(
            "UPDATE absence_intervals \
             SET leave_at = ?2, return_at = ?3, reason = ?4, source_timezone = ?5 \
             WHERE id = ?1",
            params![
                interval.id.as_bytes().to_vec(),
                Self::instant_to_text(interval.leave_at),
                interval.return_at.map(Self::instant_to_text),
                interval.reason,
                interval.source_timezone,
            ],
        )?;
        Ok(())
    }

    fn cancel_interval(&mut self, id: IntervalId, at: DateTime<Utc>) -> Result<bool, Self::Error> {
        let changed = self.conn.execute(
            "UPDATE absence_intervals SET cancelled_at = ?2 \
             WHERE id = ?1 AND cancelled_at IS NULL",
            params![id.as_bytes().to_vec(), Self::instant_to_text(at)],
        )?;
        Ok(changed > 0)
    }

    fn intervals_for_subject(
        &self,
        workspace: WorkspaceId,
        subject: SubjectId,
    ) -> Result<Vec<AbsenceInterval>, Self::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM absence_intervals \
             WHERE workspace_id = ?1 AND subject_id = ?2 AND cancelled_at IS NULL \
             ORDER BY leave_at ASC",
            INTERVAL_COLUMNS
        ))?;
        let rows = stmt.query_map(params![workspace.0 as i64, subject.0 as i64], |row| {
            Ok(Self::row_to_interval(row))
        })?;
        rows.map(|r| r?).collect()
    }

    fn intervals_for_workspace(
        &self,
        workspace: WorkspaceId,
    ) -> Result<Vec<AbsenceInterval>, Self::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM absence_intervals \
             WHERE workspace_id = ?1 AND cancelled_at IS NULL \
             ORDER BY leave_at ASC",
            INTERVAL_COLUMNS
        ))?;
        let rows = stmt.query_map(params![workspace.0 as i64], |row| {
            Ok(Self::row_to_interval(row))
        })?;
        rows.map(|r| r?).collect()
    }

    fn workspace_ids(&self) -> Result<Vec<WorkspaceId>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT workspace_id FROM absence_intervals WHERE cancelled_at IS NULL",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        rows.map(|r| Ok(WorkspaceId(r? as u64))).collect()
    }

    fn purge_returned_before(&mut self, cutoff: DateTime<Utc>) -> Result<usize, Self::Error> {
        let deleted = self.conn.execute(
            "DELETE FROM absence_intervals \
             WHERE return_at IS NOT NULL AND return_at < ?1",
            params![Self::instant_to_text(cutoff)],
        )?;
        Ok(deleted)
    }

    fn count_returned_before(&self, cutoff: DateTime<Utc>) -> Result<usize, Self::Error> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM absence_intervals \
             WHERE return_at IS NOT NULL AND return_at < ?1",
            params![Self::instant_to_text(cutoff)],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn timezone_binding(&self, scope: &TzScope) -> Result<Option<String>, Self::Error> {
        let tz = self
            .conn
            .query_row(
                "SELECT timezone FROM timezone_bindings \
                 WHERE scope_type = ?1 AND scope_key = ?2",
                params![scope.scope_type(), scope.scope_key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(tz)
    }

    fn set_timezone_binding(
        &mut self,
        scope: &TzScope,
        timezone: &str,
    ) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO timezone_bindings (scope_type, scope_key, timezone) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT(scope_type, scope_key) DO UPDATE SET timezone = excluded.timezone",
            params![scope.scope_type(), scope.scope_key(), timezone],
        )?;
        Ok(())
    }

    fn report_schedule(
        &self,
        workspace: WorkspaceId,
    ) -> Result<Option<ReportSchedule>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT workspace_id, enabled, channel_id, report_hour, last_sent_at \
             FROM report_schedules WHERE workspace_id = ?1",
        )?;
        let row = stmt
            .query_row(params![workspace.0 as i64], |row| {
                Ok(Self::row_to_schedule(row))
            })
            .optional()?;
        row.transpose()
    }

    fn set_report_schedule(&mut self, schedule: &ReportSchedule) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO report_schedules \
             (workspace_id, enabled, channel_id, report_hour, last_sent_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(workspace_id) DO UPDATE SET \
                 enabled = excluded.enabled, \
                 channel_id = excluded.channel_id, \
                 report_hour = excluded.report_hour, \
                 last_sent_at = excluded.last_sent_at",
            params![
                schedule.workspace_id.0 as i64,
                schedule.enabled,
                schedule.channel.map(|c| c.0 as i64),
                schedule.report_hour as i64,
                schedule.last_sent_at.map(Self::instant_to_text),
            ],
        )?;
        Ok(())
    }

    fn enabled_report_schedules(&self) -> Result<Vec<ReportSchedule>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT workspace_id, enabled, channel_id, report_hour, last_sent_at \
             FROM report_schedules WHERE enabled = 1",
        )?;
        let rows = stmt.query_map([], |row| Ok(Self::row_to_schedule(row)))?;
        rows.map(|r| r?).collect()
    }

    fn record_report_dispatch(
        &mut self,
        workspace: WorkspaceId,
        at: DateTime<Utc>,
    ) -> Result<(), Self::Error> {
        self.conn.execute(
            "UPDATE report_schedules SET last_sent_at = ?2 WHERE workspace_id = ?1",
            params![workspace.0 as i64, Self::instant_to_text(at)],
        )?;
        Ok(())
    }
}

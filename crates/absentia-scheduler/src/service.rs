//! Request-driven interval mutations: create, edit, cancel, and the
//! read-side digest/export queries
//!
//! All mutations run under the single serializing store lock shared with
//! the reconciler, so the overlap check and the subsequent write form one
//! atomic unit: two concurrent creations can never both observe "no
//! overlap" for the same (subject, workspace) pair.

use std::collections::HashMap;
use std::sync::Arc;

use absentia_domain::traits::IntervalStore;
use absentia_domain::{
    interval, timezone, AbsenceInterval, Clock, DomainError, IntervalId, PlatformAdapter, Status,
    SubjectId, TzScope, WorkspaceId,
};
use absentia_report::{digest_entries, render_export, ExportRow};
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;

use crate::error::SchedulerError;

/// Request to create a new absence interval
///
/// Bounds are naive local datetimes; the effective timezone is resolved
/// from `timezone` input, then the subject's binding, then the workspace's,
/// then UTC.
#[derive(Debug, Clone)]
pub struct CreateInterval {
    /// Containing workspace
    pub workspace: WorkspaceId,
    /// Member the absence applies to
    pub subject: SubjectId,
    /// Local leave datetime
    pub leave: NaiveDateTime,
    /// Local return datetime, or `None` for an indefinite absence
    pub return_at: Option<NaiveDateTime>,
    /// Free-form timezone input, if the author supplied one
    pub timezone: Option<String>,
    /// Optional reason
    pub reason: Option<String>,
    /// Acting subject (self-service or a delegate)
    pub created_by: SubjectId,
}

/// Full-replacement edit of an interval's bounds and reason
#[derive(Debug, Clone)]
pub struct EditInterval {
    /// New local leave datetime
    pub leave: NaiveDateTime,
    /// New local return datetime, or `None` to make the absence indefinite
    pub return_at: Option<NaiveDateTime>,
    /// Free-form timezone input; `None` keeps the interval's stored timezone
    pub timezone: Option<String>,
    /// Replacement reason
    pub reason: Option<String>,
}

/// Entry points exposed to the presentation layer
///
/// Shares the store lock with the reconciler (see crate docs) and the
/// platform adapter for display-name resolution in exports.
pub struct IntervalService<S, A, C> {
    store: Arc<Mutex<S>>,
    adapter: Arc<A>,
    clock: Arc<C>,
}

impl<S, A, C> IntervalService<S, A, C>
where
    S: IntervalStore,
    A: PlatformAdapter,
    C: Clock,
{
    /// Create a service over a shared store, adapter, and clock
    pub fn new(store: Arc<Mutex<S>>, adapter: Arc<A>, clock: Arc<C>) -> Self {
        Self {
            store,
            adapter,
            clock,
        }
    }

    /// Create an absence interval
    ///
    /// Validates bounds, resolves the timezone, and performs the overlap
    /// check and insert atomically. Returns the stored interval.
    pub async fn create_interval(
        &self,
        request: CreateInterval,
    ) -> Result<AbsenceInterval, SchedulerError> {
        let mut store = self.store.lock().await;

        let tz = Self::resolved_timezone(
            &*store,
            request.timezone.as_deref(),
            request.workspace,
            request.subject,
        )?;
        let leave = timezone::localize(request.leave, tz)?;
        let return_at = request
            .return_at
            .map(|naive| timezone::localize(naive, tz))
            .transpose()?;
        interval::validate_bounds(leave, return_at)?;

        if let Some(conflicting) =
            Self::find_conflict(&*store, request.workspace, request.subject, leave, return_at, None)?
        {
            return Err(DomainError::OverlapConflict { conflicting }.into());
        }

        let stored = AbsenceInterval {
            id: IntervalId::new(),
            subject_id: request.subject,
            workspace_id: request.workspace,
            leave_at: leave,
            return_at,
            reason: request.reason,
            source_timezone: tz.to_string(),
            created_by: request.created_by,
            created_at: self.clock.now(),
            cancelled_at: None,
        };
        store
            .insert_interval(stored.clone())
            .map_err(persistence)?;

        tracing::info!(
            interval = %stored.id,
            workspace = %stored.workspace_id,
            subject = %stored.subject_id,
            "created absence interval"
        );
        Ok(stored)
    }

    /// Edit an interval's bounds and reason
    ///
    /// Rejects edits to cancelled or already-completed intervals; the
    /// overlap scan excludes the interval's own id.
    pub async fn edit_interval(
        &self,
        id: IntervalId,
        patch: EditInterval,
    ) -> Result<AbsenceInterval, SchedulerError> {
        let mut store = self.store.lock().await;

        let mut stored = store
            .interval(id)
            .map_err(persistence)?
            .ok_or_else(|| DomainError::InvalidInterval(format!("no interval {}", id)))?;
        if stored.is_cancelled() {
            return Err(
                DomainError::InvalidInterval(format!("interval {} is cancelled", id)).into(),
            );
        }
        let now = self.clock.now();
        if stored.status_at(now) == Status::Completed {
            return Err(DomainError::InvalidInterval(format!(
                "interval {} has already completed",
                id
            ))
            .into());
        }

        let tz = match patch.timezone.as_deref() {
            Some(raw) => timezone::resolve(Some(raw), None, None)?,
            // Stored timezones are canonical; a row predating a tz database
            // update falls back to UTC rather than blocking the edit
            None => stored.source_timezone.parse().unwrap_or(Tz::UTC),
        };
        let leave = timezone::localize(patch.leave, tz)?;
        let return_at = patch
            .return_at
            .map(|naive| timezone::localize(naive, tz))
            .transpose()?;
        interval::validate_bounds(leave, return_at)?;

        if let Some(conflicting) = Self::find_conflict(
            &*store,
            stored.workspace_id,
            stored.subject_id,
            leave,
            return_at,
            Some(id),
        )? {
            return Err(DomainError::OverlapConflict { conflicting }.into());
        }

        stored.leave_at = leave;
        stored.return_at = return_at;
        stored.reason = patch.reason;
        stored.source_timezone = tz.to_string();
        store.update_interval(&stored).map_err(persistence)?;

        tracing::info!(interval = %id, "edited absence interval");
        Ok(stored)
    }

    /// Cancel (soft-delete) an interval
    pub async fn cancel_interval(&self, id: IntervalId) -> Result<AbsenceInterval, SchedulerError> {
        let mut store = self.store.lock().await;

        let cancelled = store
            .cancel_interval(id, self.clock.now())
            .map_err(persistence)?;
        if !cancelled {
            return Err(DomainError::InvalidInterval(format!(
                "no live interval {} to cancel",
                id
            ))
            .into());
        }
        let stored = store
            .interval(id)
            .map_err(persistence)?
            .ok_or_else(|| SchedulerError::Persistence(format!("interval {} vanished", id)))?;

        tracing::info!(interval = %id, "cancelled absence interval");
        Ok(stored)
    }

    /// Current status of one interval, cancelled included
    pub async fn classify(&self, id: IntervalId) -> Result<Status, SchedulerError> {
        let store = self.store.lock().await;
        let stored = store
            .interval(id)
            .map_err(persistence)?
            .ok_or_else(|| DomainError::InvalidInterval(format!("no interval {}", id)))?;
        Ok(stored.status_at(self.clock.now()))
    }

    /// Intervals a digest rendered now would show, ascending by leave
    pub async fn list_for_digest(
        &self,
        workspace: WorkspaceId,
    ) -> Result<Vec<AbsenceInterval>, SchedulerError> {
        let intervals = {
            let store = self.store.lock().await;
            store.intervals_for_workspace(workspace).map_err(persistence)?
        };
        let now = self.clock.now();
        Ok(digest_entries(&intervals, now)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Export every live interval in a workspace as tabular rows
    pub async fn export_all(
        &self,
        workspace: WorkspaceId,
    ) -> Result<Vec<ExportRow>, SchedulerError> {
        let intervals = {
            let store = self.store.lock().await;
            store.intervals_for_workspace(workspace).map_err(persistence)?
        };
        let names = self.resolve_names(workspace, &intervals).await;
        Ok(render_export(&intervals, &names, self.clock.now()))
    }

    async fn resolve_names(
        &self,
        workspace: WorkspaceId,
        intervals: &[AbsenceInterval],
    ) -> HashMap<SubjectId, String> {
        let mut names = HashMap::new();
        for interval in intervals {
            for subject in [interval.subject_id, interval.created_by] {
                if names.contains_key(&subject) {
                    continue;
                }
                if let Some(name) = self.adapter.display_name(workspace, subject).await {
                    names.insert(subject, name);
                }
            }
        }
        names
    }

    fn resolved_timezone(
        store: &S,
        raw: Option<&str>,
        workspace: WorkspaceId,
        subject: SubjectId,
    ) -> Result<Tz, SchedulerError> {
        let subject_binding = store
            .timezone_binding(&TzScope::Subject(workspace, subject))
            .map_err(persistence)?;
        let workspace_binding = store
            .timezone_binding(&TzScope::Workspace(workspace))
            .map_err(persistence)?;
        Ok(timezone::resolve(
            raw,
            subject_binding.as_deref(),
            workspace_binding.as_deref(),
        )?)
    }

    fn find_conflict(
        store: &S,
        workspace: WorkspaceId,
        subject: SubjectId,
        leave: DateTime<Utc>,
        return_at: Option<DateTime<Utc>>,
        exclude: Option<IntervalId>,
    ) -> Result<Option<IntervalId>, SchedulerError> {
        let existing = store
            .intervals_for_subject(workspace, subject)
            .map_err(persistence)?;
        Ok(existing
            .iter()
            .filter(|candidate| Some(candidate.id) != exclude)
            .find(|candidate| candidate.overlaps_range(leave, return_at))
            .map(|candidate| candidate.id))
    }
}

pub(crate) fn persistence<E: std::fmt::Display>(error: E) -> SchedulerError {
    SchedulerError::Persistence(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FixedClock, MockAdapter, MockStore};
    use chrono::{Duration, NaiveDate, TimeZone};

    fn naive(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn service() -> IntervalService<MockStore, MockAdapter, FixedClock> {
        let clock = FixedClock::at(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
        IntervalService::new(
            Arc::new(Mutex::new(MockStore::new())),
            Arc::new(MockAdapter::new()),
            Arc::new(clock),
        )
    }

    fn create_request(leave: NaiveDateTime, return_at: Option<NaiveDateTime>) -> CreateInterval {
        CreateInterval {
            workspace: WorkspaceId(1),
            subject: SubjectId(10),
            leave,
            return_at,
            timezone: Some("UTC".to_string()),
            reason: None,
            created_by: SubjectId(10),
        }
    }

    #[tokio::test]
    async fn test_create_stores_utc_instants() {
        let svc = service();
        let mut request = create_request(naive(10, 12), Some(naive(12, 12)));
        request.timezone = Some("Pacific/Auckland".to_string());

        let stored = svc.create_interval(request).await.unwrap();

        // NZST is UTC+12 in June
        assert_eq!(
            stored.leave_at,
            Utc.with_ymd_and_hms(2026, 6, 10, 0, 0, 0).unwrap()
        );
        assert_eq!(stored.source_timezone, "Pacific/Auckland");
        assert_eq!(
            stored.created_at,
            Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_timezone() {
        let svc = service();
        let mut request = create_request(naive(10, 12), None);
        request.timezone = Some("Atlantis/Lost".to_string());

        let err = svc.create_interval(request).await.unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Domain(DomainError::InvalidTimezone(_))
        ));
    }

    #[tokio::test]
    async fn test_create_uses_binding_precedence() {
        let store = Arc::new(Mutex::new(MockStore::new()));
        {
            let mut guard = store.lock().await;
            guard
                .set_timezone_binding(
                    &TzScope::Subject(WorkspaceId(1), SubjectId(10)),
                    "Europe/Berlin",
                )
                .unwrap();
            guard
                .set_timezone_binding(&TzScope::Workspace(WorkspaceId(1)), "America/Chicago")
                .unwrap();
        }
        let clock = FixedClock::at(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
        let svc = IntervalService::new(store, Arc::new(MockAdapter::new()), Arc::new(clock));

        let mut request = create_request(naive(10, 12), None);
        request.timezone = None;

        let stored = svc.create_interval(request).await.unwrap();
        assert_eq!(stored.source_timezone, "Europe/Berlin");
        // CEST is UTC+2 in June
        assert_eq!(
            stored.leave_at,
            Utc.with_ymd_and_hms(2026, 6, 10, 10, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_duration() {
        let svc = service();
        let err = svc
            .create_interval(create_request(naive(10, 12), Some(naive(10, 12))))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Domain(DomainError::InvalidInterval(_))
        ));
    }

    #[tokio::test]
    async fn test_create_detects_overlap_with_conflict_reference() {
        let svc = service();
        let existing = svc
            .create_interval(create_request(naive(10, 0), Some(naive(20, 0))))
            .await
            .unwrap();

        let err = svc
            .create_interval(create_request(naive(15, 0), Some(naive(25, 0))))
            .await
            .unwrap_err();
        match err {
            SchedulerError::Domain(DomainError::OverlapConflict { conflicting }) => {
                assert_eq!(conflicting, existing.id);
            }
            other => panic!("expected overlap conflict, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_create_allows_touching_boundary() {
        let svc = service();
        svc.create_interval(create_request(naive(10, 0), Some(naive(20, 0))))
            .await
            .unwrap();

        // Half-open ranges: a leave at the previous return is adjacent
        svc.create_interval(create_request(naive(20, 0), Some(naive(25, 0))))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_conflicts_with_indefinite_interval() {
        let svc = service();
        svc.create_interval(create_request(naive(5, 0), None))
            .await
            .unwrap();

        let err = svc
            .create_interval(create_request(naive(25, 0), Some(naive(28, 0))))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Domain(DomainError::OverlapConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_interval_does_not_conflict() {
        let svc = service();
        let first = svc
            .create_interval(create_request(naive(10, 0), Some(naive(20, 0))))
            .await
            .unwrap();
        svc.cancel_interval(first.id).await.unwrap();

        svc.create_interval(create_request(naive(12, 0), Some(naive(18, 0))))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_edit_excludes_own_id_from_overlap_scan() {
        let svc = service();
        let stored = svc
            .create_interval(create_request(naive(10, 0), Some(naive(20, 0))))
            .await
            .unwrap();

        // Re-submitting the same bounds must not conflict with itself
        let edited = svc
            .edit_interval(
                stored.id,
                EditInterval {
                    leave: naive(10, 0),
                    return_at: Some(naive(21, 0)),
                    timezone: None,
                    reason: Some("extended".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            edited.return_at,
            Some(Utc.with_ymd_and_hms(2026, 6, 21, 0, 0, 0).unwrap())
        );
        assert_eq!(edited.reason.as_deref(), Some("extended"));
    }

    #[tokio::test]
    async fn test_edit_conflicts_with_other_interval() {
        let svc = service();
        let first = svc
            .create_interval(create_request(naive(10, 0), Some(naive(12, 0))))
            .await
            .unwrap();
        let second = svc
            .create_interval(create_request(naive(15, 0), Some(naive(18, 0))))
            .await
            .unwrap();

        let err = svc
            .edit_interval(
                second.id,
                EditInterval {
                    leave: naive(11, 0),
                    return_at: Some(naive(18, 0)),
                    timezone: None,
                    reason: None,
                },
            )
            .await
            .unwrap_err();
        match err {
            SchedulerError::Domain(DomainError::OverlapConflict { conflicting }) => {
                assert_eq!(conflicting, first.id);
            }
            other => panic!("expected overlap conflict, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_edit_completed_interval_rejected() {
        let clock = FixedClock::at(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
        let store = Arc::new(Mutex::new(MockStore::new()));
        let clock = Arc::new(clock);
        let svc = IntervalService::new(store, Arc::new(MockAdapter::new()), clock.clone());

        let stored = svc
            .create_interval(create_request(naive(2, 0), Some(naive(3, 0))))
            .await
            .unwrap();

        clock.advance(Duration::days(10));
        let err = svc
            .edit_interval(
                stored.id,
                EditInterval {
                    leave: naive(2, 0),
                    return_at: Some(naive(4, 0)),
                    timezone: None,
                    reason: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Domain(DomainError::InvalidInterval(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_tracks_clock() {
        let clock = Arc::new(FixedClock::at(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()));
        let svc = IntervalService::new(
            Arc::new(Mutex::new(MockStore::new())),
            Arc::new(MockAdapter::new()),
            clock.clone(),
        );
        let stored = svc
            .create_interval(create_request(naive(10, 0), Some(naive(20, 0))))
            .await
            .unwrap();

        assert_eq!(svc.classify(stored.id).await.unwrap(), Status::Scheduled);
        clock.advance(Duration::days(14));
        assert_eq!(svc.classify(stored.id).await.unwrap(), Status::Active);
        clock.advance(Duration::days(14));
        assert_eq!(svc.classify(stored.id).await.unwrap(), Status::Completed);
    }

    #[tokio::test]
    async fn test_cancel_twice_fails() {
        let svc = service();
        let stored = svc
            .create_interval(create_request(naive(10, 0), None))
            .await
            .unwrap();

        let cancelled = svc.cancel_interval(stored.id).await.unwrap();
        assert!(cancelled.is_cancelled());

        assert!(svc.cancel_interval(stored.id).await.is_err());
    }

    #[tokio::test]
    async fn test_list_for_digest_filters_and_sorts() {
        let svc = service();
        let active = svc
            .create_interval(create_request(naive(1, 0), None))
            .await
            .unwrap();

        let mut far = create_request(naive(25, 0), Some(naive(28, 0)));
        far.subject = SubjectId(11);
        svc.create_interval(far).await.unwrap();

        let listed = svc.list_for_digest(WorkspaceId(1)).await.unwrap();
        assert_eq!(listed.len(), 1, "far-future scheduled entry excluded");
        assert_eq!(listed[0].id, active.id);
    }

    #[tokio::test]
    async fn test_export_all_resolves_names() {
        let adapter = Arc::new(MockAdapter::new().with_name(SubjectId(10), "Alice"));
        let clock = FixedClock::at(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap());
        let svc = IntervalService::new(
            Arc::new(Mutex::new(MockStore::new())),
            adapter,
            Arc::new(clock),
        );

        svc.create_interval(create_request(naive(10, 0), None))
            .await
            .unwrap();

        let rows = svc.export_all(WorkspaceId(1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_name, "Alice");
        assert_eq!(rows[0].created_by, "self");
    }
}

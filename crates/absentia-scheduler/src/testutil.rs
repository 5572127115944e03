//! Shared test doubles: in-memory store, recording adapter, pinnable clock

use std::collections::{HashMap, HashSet};
use std::sync::Mutex as StdMutex;

use absentia_domain::traits::IntervalStore;
use absentia_domain::{
    AbsenceInterval, AdapterError, ChannelId, IntervalId, PlatformAdapter, ReportSchedule,
    SubjectId, TzScope, WorkspaceId,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// In-memory store for unit tests
#[derive(Debug, Default)]
pub struct MockStore {
    intervals: Vec<AbsenceInterval>,
    bindings: HashMap<(String, String), String>,
    schedules: HashMap<WorkspaceId, ReportSchedule>,
    fail_message: Option<String>,
    failing_workspace: Option<WorkspaceId>,
    fail_dispatch_records: bool,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with the given message
    pub fn fail_with(&mut self, message: &str) {
        self.fail_message = Some(message.to_string());
    }

    /// Make interval reads fail for one workspace only
    pub fn fail_workspace_reads(&mut self, workspace: WorkspaceId) {
        self.failing_workspace = Some(workspace);
    }

    /// Make every `record_report_dispatch` call fail
    pub fn fail_dispatch_records(&mut self) {
        self.fail_dispatch_records = true;
    }

    fn check(&self) -> Result<(), String> {
        match &self.fail_message {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }

    fn binding_key(scope: &TzScope) -> (String, String) {
        (scope.scope_type().to_string(), scope.scope_key())
    }
}

impl IntervalStore for MockStore {
    type Error = String;

    fn insert_interval(&mut self, interval: AbsenceInterval) -> Result<(), Self::Error> {
        self.check()?;
        self.intervals.push(interval);
        Ok(())
    }

    fn interval(&self, id: IntervalId) -> Result<Option<AbsenceInterval>, Self::Error> {
        self.check()?;
        Ok(self.intervals.iter().find(|i| i.id == id).cloned())
    }

    fn update_interval(&mut self, interval: &AbsenceInterval) -> Result<(), Self::Error> {
        self.check()?;
        if let Some(slot) = self.intervals.iter_mut().find(|i| i.id == interval.id) {
            *slot = interval.clone();
        }
        Ok(())
    }

    fn cancel_interval(&mut self, id: IntervalId, at: DateTime<Utc>) -> Result<bool, Self::Error> {
        self.check()?;
        match self
            .intervals
            .iter_mut()
            .find(|i| i.id == id && !i.is_cancelled())
        {
            Some(interval) => {
                interval.cancelled_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn intervals_for_subject(
        &self,
        workspace: WorkspaceId,
        subject: SubjectId,
    ) -> Result<Vec<AbsenceInterval>, Self::Error> {
        self.check()?;
        let mut matched: Vec<_> = self
            .intervals
            .iter()
            .filter(|i| {
                i.workspace_id == workspace && i.subject_id == subject && !i.is_cancelled()
            })
            .cloned()
            .collect();
        matched.sort_by_key(|i| i.leave_at);
        Ok(matched)
    }

    fn intervals_for_workspace(
        &self,
        workspace: WorkspaceId,
    ) -> Result<Vec<AbsenceInterval>, Self::Error> {
        self.check()?;
        if self.failing_workspace == Some(workspace) {
            return Err(format!("injected failure for workspace {}", workspace));
        }
        let mut matched: Vec<_> = self
            .intervals
            .iter()
            .filter(|i| i.workspace_id == workspace && !i.is_cancelled())
            .cloned()
            .collect();
        matched.sort_by_key(|i| i.leave_at);
        Ok(matched)
    }

    fn workspace_ids(&self) -> Result<Vec<WorkspaceId>, Self::Error> {
        self.check()?;
        let mut ids: Vec<_> = self
            .intervals
            .iter()
            .filter(|i| !i.is_cancelled())
            .map(|i| i.workspace_id)
            .collect();
        ids.sort_by_key(|w| w.0);
        ids.dedup();
        Ok(ids)
    }

    fn purge_returned_before(&mut self, cutoff: DateTime<Utc>) -> Result<usize, Self::Error> {
        self.check()?;
        let before = self.intervals.len();
        self.intervals
            .retain(|i| !matches!(i.return_at, Some(ret) if ret < cutoff));
        Ok(before - self.intervals.len())
    }

    fn count_returned_before(&self, cutoff: DateTime<Utc>) -> Result<usize, Self::Error> {
        self.check()?;
        Ok(self
            .intervals
            .iter()
            .filter(|i| matches!(i.return_at, Some(ret) if ret < cutoff))
            .count())
    }

    fn timezone_binding(&self, scope: &TzScope) -> Result<Option<String>, Self::Error> {
        self.check()?;
        Ok(self.bindings.get(&Self::binding_key(scope)).cloned())
    }

    fn set_timezone_binding(
        &mut self,
        scope: &TzScope,
        timezone: &str,
    ) -> Result<(), Self::Error> {
        self.check()?;
        self.bindings
            .insert(Self::binding_key(scope), timezone.to_string());
        Ok(())
    }

    fn report_schedule(
        &self,
        workspace: WorkspaceId,
    ) -> Result<Option<ReportSchedule>, Self::Error> {
        self.check()?;
        Ok(self.schedules.get(&workspace).cloned())
    }

    fn set_report_schedule(&mut self, schedule: &ReportSchedule) -> Result<(), Self::Error> {
        self.check()?;
        self.schedules
            .insert(schedule.workspace_id, schedule.clone());
        Ok(())
    }

    fn enabled_report_schedules(&self) -> Result<Vec<ReportSchedule>, Self::Error> {
        self.check()?;
        let mut enabled: Vec<_> = self
            .schedules
            .values()
            .filter(|s| s.enabled)
            .cloned()
            .collect();
        enabled.sort_by_key(|s| s.workspace_id.0);
        Ok(enabled)
    }

    fn record_report_dispatch(
        &mut self,
        workspace: WorkspaceId,
        at: DateTime<Utc>,
    ) -> Result<(), Self::Error> {
        self.check()?;
        if self.fail_dispatch_records {
            return Err("injected dispatch record failure".to_string());
        }
        if let Some(schedule) = self.schedules.get_mut(&workspace) {
            schedule.last_sent_at = Some(at);
        }
        Ok(())
    }
}

/// Recording adapter with per-subject failure injection
#[derive(Debug, Default)]
pub struct MockAdapter {
    pub applied: StdMutex<Vec<(WorkspaceId, SubjectId)>>,
    pub removed: StdMutex<Vec<(WorkspaceId, SubjectId)>>,
    pub sent: StdMutex<Vec<(WorkspaceId, Option<ChannelId>, String)>>,
    names: HashMap<SubjectId, String>,
    failing_subjects: HashSet<SubjectId>,
    fail_sends: bool,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `subject` to `name` in [`PlatformAdapter::display_name`]
    pub fn with_name(mut self, subject: SubjectId, name: &str) -> Self {
        self.names.insert(subject, name.to_string());
        self
    }

    /// Fail marker calls for one subject
    pub fn with_failing_subject(mut self, subject: SubjectId) -> Self {
        self.failing_subjects.insert(subject);
        self
    }

    /// Fail every [`PlatformAdapter::send_report`] call
    pub fn with_failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn applied_count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }

    pub fn removed_count(&self) -> usize {
        self.removed.lock().unwrap().len()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl PlatformAdapter for MockAdapter {
    async fn apply_absence_marker(
        &self,
        workspace: WorkspaceId,
        subject: SubjectId,
    ) -> Result<(), AdapterError> {
        if self.failing_subjects.contains(&subject) {
            return Err(AdapterError::Unavailable("injected failure".to_string()));
        }
        self.applied.lock().unwrap().push((workspace, subject));
        Ok(())
    }

    async fn remove_absence_marker(
        &self,
        workspace: WorkspaceId,
        subject: SubjectId,
    ) -> Result<(), AdapterError> {
        if self.failing_subjects.contains(&subject) {
            return Err(AdapterError::Unavailable("injected failure".to_string()));
        }
        self.removed.lock().unwrap().push((workspace, subject));
        Ok(())
    }

    async fn send_report(
        &self,
        workspace: WorkspaceId,
        channel: Option<ChannelId>,
        body: &str,
    ) -> Result<(), AdapterError> {
        if self.fail_sends {
            return Err(AdapterError::Unavailable("injected failure".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((workspace, channel, body.to_string()));
        Ok(())
    }

    async fn display_name(&self, _workspace: WorkspaceId, subject: SubjectId) -> Option<String> {
        self.names.get(&subject).cloned()
    }
}

/// Clock pinned to a settable instant
#[derive(Debug)]
pub struct FixedClock {
    now: StdMutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            now: StdMutex::new(instant),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap() = instant;
    }
}

impl absentia_domain::Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

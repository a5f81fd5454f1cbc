use std::sync::Arc;

use tutor_core::model::{SessionId, TaskId, TaskPhase, TaskProgress};

use super::service::ProgressService;
use crate::error::ProgressError;
use crate::session_identity::SessionIdentity;

/// Caller-held view of one learner's progress.
///
/// The snapshot only changes after the store confirms a write. A failed call
/// leaves the snapshot, and so `current_phase`, exactly as it was.
#[derive(Clone)]
pub struct TaskProgressTracker {
    service: Arc<ProgressService>,
    session: Option<SessionId>,
    default_task: Option<TaskId>,
    snapshot: Option<TaskProgress>,
}

impl TaskProgressTracker {
    #[must_use]
    pub fn new(service: Arc<ProgressService>, session: Option<SessionId>) -> Self {
        Self {
            service,
            session,
            default_task: None,
            snapshot: None,
        }
    }

    /// Build a tracker for whatever session the identity provider reports now.
    #[must_use]
    pub fn for_identity(service: Arc<ProgressService>, identity: &dyn SessionIdentity) -> Self {
        Self::new(service, identity.session_id())
    }

    /// Bind the task used when a call does not name one.
    #[must_use]
    pub fn with_default_task(mut self, task_id: TaskId) -> Self {
        self.default_task = Some(task_id);
        self
    }

    #[must_use]
    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    /// Last confirmed progress, if any has been loaded.
    #[must_use]
    pub fn snapshot(&self) -> Option<&TaskProgress> {
        self.snapshot.as_ref()
    }

    fn resolve(&self, task_id: Option<&TaskId>) -> Result<TaskId, ProgressError> {
        task_id
            .or(self.default_task.as_ref())
            .cloned()
            .ok_or(ProgressError::MissingTask)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::MissingTask` if no task is given or bound, or
    /// `ProgressError::Storage` if the store fails.
    pub async fn fetch_progress(
        &mut self,
        task_id: Option<&TaskId>,
    ) -> Result<Option<TaskProgress>, ProgressError> {
        let task_id = self.resolve(task_id)?;
        let fetched = self
            .service
            .fetch_progress(self.session.as_ref(), &task_id)
            .await?;
        if let Some(progress) = &fetched {
            self.snapshot = Some(progress.clone());
        }
        Ok(fetched)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::MissingTask` if no task is given or bound, or
    /// `ProgressError::Storage` if the store fails.
    pub async fn mark_quiz_passed(
        &mut self,
        task_id: Option<&TaskId>,
    ) -> Result<Option<TaskProgress>, ProgressError> {
        let task_id = self.resolve(task_id)?;
        let updated = self
            .service
            .mark_quiz_passed(self.session.as_ref(), &task_id)
            .await?;
        if let Some(progress) = &updated {
            self.snapshot = Some(progress.clone());
        }
        Ok(updated)
    }

    /// Count one finished exercise and return the new total.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::MissingTask` if no task is given or bound, or
    /// `ProgressError::Storage` if the store fails.
    pub async fn increment_exercise(
        &mut self,
        task_id: Option<&TaskId>,
    ) -> Result<Option<u32>, ProgressError> {
        let task_id = self.resolve(task_id)?;
        let updated = self
            .service
            .record_exercise(self.session.as_ref(), &task_id)
            .await?;
        Ok(updated.map(|progress| {
            let count = progress.exercises_completed();
            self.snapshot = Some(progress);
            count
        }))
    }

    /// Phase of the last confirmed snapshot, without a store round trip.
    #[must_use]
    pub fn current_phase(&self) -> TaskPhase {
        self.snapshot
            .as_ref()
            .map_or(TaskPhase::Theory, TaskProgress::derived_phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Clock;
    use crate::session_identity::FixedSessionIdentity;
    use storage::repository::InMemoryRepository;
    use tutor_core::time::fixed_now;

    fn tracker(identity: &dyn SessionIdentity) -> TaskProgressTracker {
        let service = ProgressService::new(
            Clock::fixed(fixed_now()),
            Arc::new(InMemoryRepository::new()),
        );
        TaskProgressTracker::for_identity(Arc::new(service), identity)
            .with_default_task(TaskId::new("task-1").unwrap())
    }

    #[test]
    fn phase_without_progress_is_theory() {
        let identity = FixedSessionIdentity::new(SessionId::new("s").unwrap());
        assert_eq!(tracker(&identity).current_phase(), TaskPhase::Theory);
    }

    #[tokio::test]
    async fn snapshot_follows_confirmed_writes() {
        let identity = FixedSessionIdentity::new(SessionId::new("s").unwrap());
        let mut tracker = tracker(&identity);

        tracker.fetch_progress(None).await.unwrap();
        assert_eq!(tracker.current_phase(), TaskPhase::Theory);

        tracker.mark_quiz_passed(None).await.unwrap();
        assert_eq!(tracker.current_phase(), TaskPhase::Exercises);

        for expected in 1..=4 {
            assert_eq!(tracker.increment_exercise(None).await.unwrap(), Some(expected));
        }
        assert_eq!(tracker.current_phase(), TaskPhase::Completed);
        assert_eq!(tracker.snapshot().unwrap().exercises_completed(), 4);
    }

    #[tokio::test]
    async fn anonymous_tracker_stays_in_theory() {
        let mut tracker = tracker(&FixedSessionIdentity::anonymous());

        assert!(tracker.fetch_progress(None).await.unwrap().is_none());
        assert!(tracker.mark_quiz_passed(None).await.unwrap().is_none());
        assert!(tracker.increment_exercise(None).await.unwrap().is_none());
        assert!(tracker.snapshot().is_none());
        assert_eq!(tracker.current_phase(), TaskPhase::Theory);
    }

    #[tokio::test]
    async fn missing_task_is_reported() {
        let service = ProgressService::new(
            Clock::fixed(fixed_now()),
            Arc::new(InMemoryRepository::new()),
        );
        let mut tracker =
            TaskProgressTracker::new(Arc::new(service), Some(SessionId::new("s").unwrap()));

        let err = tracker.fetch_progress(None).await.unwrap_err();
        assert!(matches!(err, ProgressError::MissingTask));
    }

    #[tokio::test]
    async fn explicit_task_overrides_default() {
        let identity = FixedSessionIdentity::new(SessionId::new("s").unwrap());
        let mut tracker = tracker(&identity);
        let other = TaskId::new("task-2").unwrap();

        let progress = tracker.fetch_progress(Some(&other)).await.unwrap().unwrap();
        assert_eq!(progress.task_id(), &other);
    }
}

use std::sync::Arc;

use storage::repository::{StorageError, TaskProgressRepository};
use tutor_core::model::{ProgressReport, SessionId, TaskId, TaskProgress};

use crate::Clock;
use crate::error::ProgressError;

/// Every progress row of one session plus the aggregate a parent dashboard shows.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProgressReport {
    pub session_id: SessionId,
    pub report: ProgressReport,
    pub tasks: Vec<TaskProgress>,
}

/// Persisted progress state machine for tasks.
///
/// Every call names the learner session explicitly. A missing session is not
/// an error: the call does nothing and returns `Ok(None)`.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn TaskProgressRepository>,
}

fn logged(
    op: &'static str,
    task_id: Option<&TaskId>,
) -> impl FnOnce(StorageError) -> ProgressError {
    let task = task_id.map(ToString::to_string);
    move |err| {
        tracing::warn!(
            op,
            task_id = task.as_deref().unwrap_or("-"),
            error = %err,
            "progress store failed"
        );
        ProgressError::Storage(err)
    }
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn TaskProgressRepository>) -> Self {
        Self { clock, progress }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Load progress for a task, creating the default row on first access.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the store fails.
    pub async fn fetch_progress(
        &self,
        session: Option<&SessionId>,
        task_id: &TaskId,
    ) -> Result<Option<TaskProgress>, ProgressError> {
        let Some(session) = session else {
            tracing::debug!(%task_id, "fetch_progress skipped: no session");
            return Ok(None);
        };

        let initial = TaskProgress::new(task_id.clone(), session.clone(), self.clock.now());
        let progress = self
            .progress
            .find_or_create(&initial)
            .await
            .map_err(logged("fetch_progress", Some(task_id)))?;
        Ok(Some(progress))
    }

    /// Open the quiz gate for a task and move it to the exercises phase.
    ///
    /// Creates the row directly in the exercises phase if it does not exist.
    /// Repeated calls leave the observable state unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the read or the write fails; the
    /// phase must then be treated as unchanged.
    pub async fn mark_quiz_passed(
        &self,
        session: Option<&SessionId>,
        task_id: &TaskId,
    ) -> Result<Option<TaskProgress>, ProgressError> {
        let Some(session) = session else {
            tracing::debug!(%task_id, "mark_quiz_passed skipped: no session");
            return Ok(None);
        };

        let now = self.clock.now();
        let (mut progress, existed) = self
            .load_or_default(session, task_id, now)
            .await
            .map_err(logged("mark_quiz_passed", Some(task_id)))?;

        let opened = progress.mark_quiz_passed(now);
        let progress = self
            .persist(progress, existed)
            .await
            .map_err(logged("mark_quiz_passed", Some(task_id)))?;

        if opened {
            tracing::info!(%task_id, phase = %progress.current_phase(), "quiz passed");
        }
        Ok(Some(progress))
    }

    /// Count one finished exercise and return the updated row.
    ///
    /// A task without a row is created as quiz-passed with one exercise.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the read or the write fails.
    pub async fn record_exercise(
        &self,
        session: Option<&SessionId>,
        task_id: &TaskId,
    ) -> Result<Option<TaskProgress>, ProgressError> {
        let Some(session) = session else {
            tracing::debug!(%task_id, "increment_exercise skipped: no session");
            return Ok(None);
        };

        let now = self.clock.now();
        let (mut progress, existed) = self
            .load_or_default(session, task_id, now)
            .await
            .map_err(logged("increment_exercise", Some(task_id)))?;

        // Read-modify-write without a version check: concurrent writers to
        // the same key are last-write-wins.
        let count = progress.record_exercise(now);
        let progress = self
            .persist(progress, existed)
            .await
            .map_err(logged("increment_exercise", Some(task_id)))?;

        if progress.is_completed() {
            tracing::info!(%task_id, exercises = count, "task completed");
        } else {
            tracing::info!(%task_id, exercises = count, "exercise recorded");
        }
        Ok(Some(progress))
    }

    /// Count one finished exercise and return the new total.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the read or the write fails.
    pub async fn increment_exercise(
        &self,
        session: Option<&SessionId>,
        task_id: &TaskId,
    ) -> Result<Option<u32>, ProgressError> {
        Ok(self
            .record_exercise(session, task_id)
            .await?
            .map(|p| p.exercises_completed()))
    }

    /// Summarise every task a session has touched.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if rows cannot be listed.
    pub async fn session_report(
        &self,
        session: Option<&SessionId>,
    ) -> Result<Option<SessionProgressReport>, ProgressError> {
        let Some(session) = session else {
            tracing::debug!("session_report skipped: no session");
            return Ok(None);
        };

        let tasks = self
            .progress
            .list_for_session(session)
            .await
            .map_err(logged("session_report", None))?;
        Ok(Some(SessionProgressReport {
            session_id: session.clone(),
            report: ProgressReport::from_progress(&tasks),
            tasks,
        }))
    }

    /// Stored row plus `true`, or a fresh default plus `false` if none exists.
    async fn load_or_default(
        &self,
        session: &SessionId,
        task_id: &TaskId,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(TaskProgress, bool), StorageError> {
        Ok(match self.progress.get_progress(task_id, session).await? {
            Some(progress) => (progress, true),
            None => (
                TaskProgress::new(task_id.clone(), session.clone(), now),
                false,
            ),
        })
    }

    /// Write `progress` and return what the store now holds.
    ///
    /// A row created here may lose the insert to a concurrent writer, in which
    /// case the store keeps that writer's `id` and `created_at`.
    async fn persist(
        &self,
        progress: TaskProgress,
        existed: bool,
    ) -> Result<TaskProgress, StorageError> {
        self.progress.upsert_progress(&progress).await?;
        if existed {
            return Ok(progress);
        }
        Ok(self
            .progress
            .get_progress(progress.task_id(), progress.session_id())
            .await?
            .unwrap_or(progress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use tutor_core::model::{EXERCISE_QUOTA, TaskPhase};
    use tutor_core::time::fixed_now;

    fn service() -> (ProgressService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let svc = ProgressService::new(Clock::fixed(fixed_now()), Arc::new(repo.clone()));
        (svc, repo)
    }

    fn ids() -> (SessionId, TaskId) {
        (
            SessionId::new("session-a").unwrap(),
            TaskId::new("task-1").unwrap(),
        )
    }

    #[tokio::test]
    async fn fresh_task_is_created_in_theory() {
        let (svc, repo) = service();
        let (session, task) = ids();

        let progress = svc.fetch_progress(Some(&session), &task).await.unwrap().unwrap();

        assert!(!progress.quiz_passed());
        assert_eq!(progress.exercises_completed(), 0);
        assert_eq!(progress.current_phase(), TaskPhase::Theory);
        assert_eq!(repo.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn fetch_is_idempotent() {
        let (svc, repo) = service();
        let (session, task) = ids();

        let first = svc.fetch_progress(Some(&session), &task).await.unwrap();
        let second = svc.fetch_progress(Some(&session), &task).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn no_session_is_a_no_op() {
        let (svc, repo) = service();
        let (_, task) = ids();

        assert!(svc.fetch_progress(None, &task).await.unwrap().is_none());
        assert!(svc.mark_quiz_passed(None, &task).await.unwrap().is_none());
        assert!(svc.increment_exercise(None, &task).await.unwrap().is_none());
        assert!(svc.session_report(None).await.unwrap().is_none());
        assert_eq!(repo.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn quiz_pass_then_four_exercises_completes() {
        let (svc, _repo) = service();
        let (session, task) = ids();
        svc.fetch_progress(Some(&session), &task).await.unwrap();

        let passed = svc
            .mark_quiz_passed(Some(&session), &task)
            .await
            .unwrap()
            .unwrap();
        assert!(passed.quiz_passed());
        assert_eq!(passed.current_phase(), TaskPhase::Exercises);

        let mut counts = Vec::new();
        for _ in 0..EXERCISE_QUOTA {
            counts.push(
                svc.increment_exercise(Some(&session), &task)
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }
        assert_eq!(counts, vec![1, 2, 3, 4]);

        let done = svc.fetch_progress(Some(&session), &task).await.unwrap().unwrap();
        assert_eq!(done.current_phase(), TaskPhase::Completed);
    }

    #[tokio::test]
    async fn quiz_pass_without_row_creates_exercises_row() {
        let (svc, repo) = service();
        let (session, task) = ids();

        let progress = svc
            .mark_quiz_passed(Some(&session), &task)
            .await
            .unwrap()
            .unwrap();

        assert!(progress.quiz_passed());
        assert_eq!(progress.exercises_completed(), 0);
        assert_eq!(progress.current_phase(), TaskPhase::Exercises);
        assert_eq!(repo.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn exercise_without_row_assumes_quiz_passed() {
        let (svc, _repo) = service();
        let (session, task) = ids();

        let count = svc.increment_exercise(Some(&session), &task).await.unwrap();
        assert_eq!(count, Some(1));

        let progress = svc.fetch_progress(Some(&session), &task).await.unwrap().unwrap();
        assert!(progress.quiz_passed());
        assert_eq!(progress.exercises_completed(), 1);
        assert_eq!(progress.current_phase(), TaskPhase::Exercises);
    }

    #[tokio::test]
    async fn second_quiz_pass_changes_nothing_observable() {
        let (svc, _repo) = service();
        let (session, task) = ids();

        let first = svc.mark_quiz_passed(Some(&session), &task).await.unwrap();
        let second = svc.mark_quiz_passed(Some(&session), &task).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn report_counts_tasks_for_session_only() {
        let (svc, _repo) = service();
        let (session, task) = ids();
        let other_task = TaskId::new("task-2").unwrap();
        let other_session = SessionId::new("session-b").unwrap();

        svc.mark_quiz_passed(Some(&session), &task).await.unwrap();
        for _ in 0..EXERCISE_QUOTA {
            svc.increment_exercise(Some(&session), &task).await.unwrap();
        }
        svc.fetch_progress(Some(&session), &other_task).await.unwrap();
        svc.fetch_progress(Some(&other_session), &task).await.unwrap();

        let report = svc.session_report(Some(&session)).await.unwrap().unwrap();
        assert_eq!(report.tasks.len(), 2);
        assert_eq!(report.report.tasks_tracked, 2);
        assert_eq!(report.report.completed, 1);
        assert_eq!(report.report.in_theory, 1);
        assert_eq!(report.report.exercises_done, EXERCISE_QUOTA);
    }
}

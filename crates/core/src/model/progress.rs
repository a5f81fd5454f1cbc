use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{EXERCISE_QUOTA, ProgressId, SessionId, TaskId, TaskPhase};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TaskProgressError {
    #[error("updated_at is before created_at")]
    InvalidTimeRange,

    #[error(
        "stored phase {phase} contradicts quiz_passed={quiz_passed}, exercises_completed={exercises_completed}"
    )]
    PhaseMismatch {
        phase: TaskPhase,
        quiz_passed: bool,
        exercises_completed: u32,
    },
}

/// Progress of one learner session through one task.
///
/// The phase is kept alongside the facts it derives from so storage can
/// filter on it, but every mutation goes through this type and re-derives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    id: ProgressId,
    task_id: TaskId,
    session_id: SessionId,
    quiz_passed: bool,
    exercises_completed: u32,
    current_phase: TaskPhase,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TaskProgress {
    /// Fresh progress for a task the learner has not touched yet.
    #[must_use]
    pub fn new(task_id: TaskId, session_id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id: ProgressId::generate(),
            task_id,
            session_id,
            quiz_passed: false,
            exercises_completed: 0,
            current_phase: TaskPhase::Theory,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrate progress from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `TaskProgressError::InvalidTimeRange` if `updated_at` precedes
    /// `created_at`, or `TaskProgressError::PhaseMismatch` if the stored phase
    /// cannot have been derived from the stored facts.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ProgressId,
        task_id: TaskId,
        session_id: SessionId,
        quiz_passed: bool,
        exercises_completed: u32,
        current_phase: TaskPhase,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, TaskProgressError> {
        if updated_at < created_at {
            return Err(TaskProgressError::InvalidTimeRange);
        }
        if !current_phase.is_consistent_with(quiz_passed, exercises_completed) {
            return Err(TaskProgressError::PhaseMismatch {
                phase: current_phase,
                quiz_passed,
                exercises_completed,
            });
        }

        Ok(Self {
            id,
            task_id,
            session_id,
            quiz_passed,
            exercises_completed,
            current_phase,
            created_at,
            updated_at,
        })
    }

    /// Open the quiz gate.
    ///
    /// Returns `true` if the gate was closed before. A completed task stays
    /// completed.
    pub fn mark_quiz_passed(&mut self, now: DateTime<Utc>) -> bool {
        let changed = !self.quiz_passed;
        self.quiz_passed = true;
        self.current_phase = TaskPhase::derive(true, self.exercises_completed);
        self.touch(now);
        changed
    }

    /// Count one more finished exercise and return the new total.
    ///
    /// Exercises are only reachable past the quiz gate, so this also opens it.
    pub fn record_exercise(&mut self, now: DateTime<Utc>) -> u32 {
        self.exercises_completed = self.exercises_completed.saturating_add(1);
        self.quiz_passed = true;
        self.current_phase = TaskPhase::after_exercise(self.exercises_completed);
        self.touch(now);
        self.exercises_completed
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    #[must_use]
    pub fn id(&self) -> ProgressId {
        self.id
    }

    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    #[must_use]
    pub fn quiz_passed(&self) -> bool {
        self.quiz_passed
    }

    #[must_use]
    pub fn exercises_completed(&self) -> u32 {
        self.exercises_completed
    }

    /// Phase as stored with the row.
    #[must_use]
    pub fn current_phase(&self) -> TaskPhase {
        self.current_phase
    }

    /// Phase derived from `quiz_passed` and `exercises_completed`.
    #[must_use]
    pub fn derived_phase(&self) -> TaskPhase {
        TaskPhase::derive(self.quiz_passed, self.exercises_completed)
    }

    #[must_use]
    pub fn exercises_remaining(&self) -> u32 {
        EXERCISE_QUOTA.saturating_sub(self.exercises_completed)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.exercises_completed >= EXERCISE_QUOTA
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

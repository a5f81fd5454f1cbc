use serde::Serialize;

use crate::model::{EXERCISE_QUOTA, TaskPhase, TaskProgress};

/// Parent-facing aggregate over all tracked tasks of one learner session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressReport {
    pub tasks_tracked: u32,
    pub in_theory: u32,
    pub in_exercises: u32,
    pub completed: u32,
    pub exercises_done: u32,
    pub exercises_required: u32,
}

impl ProgressReport {
    /// Aggregate rows by their derived phase.
    ///
    /// Exercises past the quota are not counted towards `exercises_done`.
    #[must_use]
    pub fn from_progress(rows: &[TaskProgress]) -> Self {
        let mut report = Self::default();
        for row in rows {
            report.tasks_tracked = report.tasks_tracked.saturating_add(1);
            match row.derived_phase() {
                TaskPhase::Theory | TaskPhase::Quiz => {
                    report.in_theory = report.in_theory.saturating_add(1);
                }
                TaskPhase::Exercises => {
                    report.in_exercises = report.in_exercises.saturating_add(1);
                }
                TaskPhase::Completed => {
                    report.completed = report.completed.saturating_add(1);
                }
            }
            report.exercises_done = report
                .exercises_done
                .saturating_add(row.exercises_completed().min(EXERCISE_QUOTA));
            report.exercises_required = report.exercises_required.saturating_add(EXERCISE_QUOTA);
        }
        report
    }

    /// Fraction of tracked tasks that are completed, in `0.0..=1.0`.
    #[must_use]
    pub fn completion_ratio(&self) -> f64 {
        if self.tasks_tracked == 0 {
            return 0.0;
        }
        f64::from(self.completed) / f64::from(self.tasks_tracked)
    }
}

use tutor_core::model::{QuizOutcome, TaskPhase, TaskProgress};

use super::tracker::TaskProgressTracker;
use crate::error::FlowError;

/// Screen the learner should currently see for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowScreen {
    Theory,
    Quiz,
    ProblemSelection,
    Solving { problem: usize },
    Completion,
}

impl FlowScreen {
    /// Screen to resume on for a persisted phase.
    #[must_use]
    pub fn for_phase(phase: TaskPhase) -> Self {
        match phase {
            TaskPhase::Theory | TaskPhase::Quiz => Self::Theory,
            TaskPhase::Exercises => Self::ProblemSelection,
            TaskPhase::Completed => Self::Completion,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Theory => "theory",
            Self::Quiz => "quiz",
            Self::ProblemSelection => "problem selection",
            Self::Solving { .. } => "solving",
            Self::Completion => "completion",
        }
    }
}

/// Drives screen selection for one task on top of a progress tracker.
///
/// Persistence failures are returned to the caller and leave the screen
/// unchanged, so the learner can retry the same action.
pub struct ExerciseFlow {
    tracker: TaskProgressTracker,
    screen: FlowScreen,
}

impl ExerciseFlow {
    /// The tracker should have a default task bound; flow actions never name one.
    #[must_use]
    pub fn new(tracker: TaskProgressTracker) -> Self {
        let screen = FlowScreen::for_phase(tracker.current_phase());
        Self { tracker, screen }
    }

    #[must_use]
    pub fn screen(&self) -> FlowScreen {
        self.screen
    }

    #[must_use]
    pub fn progress(&self) -> Option<&TaskProgress> {
        self.tracker.snapshot()
    }

    #[must_use]
    pub fn tracker(&self) -> &TaskProgressTracker {
        &self.tracker
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        FlowError::InvalidAction {
            action,
            screen: self.screen.name(),
        }
    }

    /// Load persisted progress and resume on the matching screen.
    ///
    /// Without a session the flow stays on the theory screen.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Progress` if progress cannot be loaded.
    pub async fn load(&mut self) -> Result<FlowScreen, FlowError> {
        self.tracker.fetch_progress(None).await?;
        self.screen = FlowScreen::for_phase(self.tracker.current_phase());
        Ok(self.screen)
    }

    /// # Errors
    ///
    /// Returns `FlowError::InvalidAction` unless on the theory screen.
    pub fn start_quiz(&mut self) -> Result<FlowScreen, FlowError> {
        if self.screen != FlowScreen::Theory {
            return Err(self.invalid("start the quiz"));
        }
        self.screen = FlowScreen::Quiz;
        Ok(self.screen)
    }

    /// Submit a quiz attempt. A failed attempt keeps the quiz open for retry.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidAction` unless on the quiz screen,
    /// `FlowError::NoSession` without a learner session, or
    /// `FlowError::Progress` if the pass cannot be persisted.
    pub async fn submit_quiz(&mut self, outcome: &QuizOutcome) -> Result<FlowScreen, FlowError> {
        if self.screen != FlowScreen::Quiz {
            return Err(self.invalid("submit the quiz"));
        }
        if self.tracker.session().is_none() {
            return Err(FlowError::NoSession);
        }
        if !outcome.passed() {
            tracing::debug!(wrong = outcome.wrong(), "quiz attempt failed");
            return Ok(self.screen);
        }

        self.tracker
            .mark_quiz_passed(None)
            .await?
            .ok_or(FlowError::NoSession)?;
        self.screen = FlowScreen::for_phase(self.tracker.current_phase());
        Ok(self.screen)
    }

    /// # Errors
    ///
    /// Returns `FlowError::InvalidAction` unless on the problem selection screen.
    pub fn select_problem(&mut self, problem: usize) -> Result<FlowScreen, FlowError> {
        if self.screen != FlowScreen::ProblemSelection {
            return Err(self.invalid("select a problem"));
        }
        self.screen = FlowScreen::Solving { problem };
        Ok(self.screen)
    }

    /// Leave the current problem without counting it.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidAction` unless solving a problem.
    pub fn back_to_selection(&mut self) -> Result<FlowScreen, FlowError> {
        if !matches!(self.screen, FlowScreen::Solving { .. }) {
            return Err(self.invalid("go back to problem selection"));
        }
        self.screen = FlowScreen::ProblemSelection;
        Ok(self.screen)
    }

    /// Count the problem being solved as one finished exercise.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidAction` unless solving a problem,
    /// `FlowError::NoSession` without a learner session, or
    /// `FlowError::Progress` if the exercise cannot be persisted.
    pub async fn complete_problem(&mut self) -> Result<FlowScreen, FlowError> {
        if !matches!(self.screen, FlowScreen::Solving { .. }) {
            return Err(self.invalid("complete a problem"));
        }
        if self.tracker.session().is_none() {
            return Err(FlowError::NoSession);
        }

        self.tracker
            .increment_exercise(None)
            .await?
            .ok_or(FlowError::NoSession)?;
        self.screen = if self.tracker.current_phase().is_terminal() {
            FlowScreen::Completion
        } else {
            FlowScreen::ProblemSelection
        };
        Ok(self.screen)
    }
}

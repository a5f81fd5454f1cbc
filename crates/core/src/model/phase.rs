use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of exercises that completes a task.
pub const EXERCISE_QUOTA: u32 = 4;

/// Coarse position of a learner within a task's workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Theory,
    Quiz,
    Exercises,
    Completed,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid task phase: {0}")]
pub struct ParsePhaseError(pub String);

impl TaskPhase {
    pub const ALL: [TaskPhase; 4] = [
        TaskPhase::Theory,
        TaskPhase::Quiz,
        TaskPhase::Exercises,
        TaskPhase::Completed,
    ];

    /// Derive the phase from the two persisted progress facts.
    ///
    /// `Quiz` is never derived: it is a screen the learner moves to locally
    /// while the quiz gate is still closed.
    #[must_use]
    pub fn derive(quiz_passed: bool, exercises_completed: u32) -> Self {
        if !quiz_passed {
            Self::Theory
        } else if exercises_completed >= EXERCISE_QUOTA {
            Self::Completed
        } else {
            Self::Exercises
        }
    }

    /// Phase reached after an exercise increment that produced `count`.
    #[must_use]
    pub fn after_exercise(count: u32) -> Self {
        Self::derive(true, count)
    }

    /// Whether a stored phase agrees with the facts it was derived from.
    #[must_use]
    pub fn is_consistent_with(self, quiz_passed: bool, exercises_completed: u32) -> bool {
        match self {
            Self::Theory | Self::Quiz => !quiz_passed && exercises_completed == 0,
            other => other == Self::derive(quiz_passed, exercises_completed),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Theory => "theory",
            Self::Quiz => "quiz",
            Self::Exercises => "exercises",
            Self::Completed => "completed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPhase {
    type Err = ParsePhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "theory" => Ok(Self::Theory),
            "quiz" => Ok(Self::Quiz),
            "exercises" => Ok(Self::Exercises),
            "completed" => Ok(Self::Completed),
            other => Err(ParsePhaseError(other.to_owned())),
        }
    }
}

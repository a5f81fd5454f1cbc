mod ids;
mod phase;
mod progress;
mod quiz;
mod report;

pub use ids::{IdError, ProgressId, SessionId, TaskId};
pub use phase::{EXERCISE_QUOTA, ParsePhaseError, TaskPhase};
pub use progress::{TaskProgress, TaskProgressError};
pub use quiz::{MAX_WRONG_ANSWERS, QuizOutcome, QuizOutcomeError};
pub use report::ProgressReport;

mod flow;
mod service;
mod tracker;

// Public API of the progress subsystem.
pub use crate::error::{FlowError, ProgressError};
pub use flow::{ExerciseFlow, FlowScreen};
pub use service::{ProgressService, SessionProgressReport};
pub use tracker::TaskProgressTracker;

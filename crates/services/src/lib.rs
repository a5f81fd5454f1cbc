#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod progress;
pub mod session_identity;

pub use tutor_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, FlowError, ProgressError, SessionIdentityError};
pub use progress::{
    ExerciseFlow, FlowScreen, ProgressService, SessionProgressReport, TaskProgressTracker,
};
pub use session_identity::{FileSessionIdentity, FixedSessionIdentity, SessionIdentity};

//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService` and `TaskProgressTracker`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("no task given and no default task bound")]
    MissingTask,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ExerciseFlow`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlowError {
    #[error("cannot {action} while on the {screen} screen")]
    InvalidAction {
        action: &'static str,
        screen: &'static str,
    },
    #[error("no learner session is active")]
    NoSession,
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Errors emitted while loading or persisting the learner session token.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionIdentityError {
    #[error("session token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

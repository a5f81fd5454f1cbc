use std::sync::Arc;

use storage::repository::Storage;
use tutor_core::model::TaskId;

use crate::Clock;
use crate::error::AppServicesError;
use crate::progress::{ExerciseFlow, ProgressService, TaskProgressTracker};
use crate::session_identity::SessionIdentity;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage cannot be opened or migrated.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over volatile in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let progress = Arc::new(ProgressService::new(clock, Arc::clone(&storage.progress)));
        Self { progress }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    /// A tracker bound to the current learner session and, optionally, a task.
    #[must_use]
    pub fn tracker(
        &self,
        identity: &dyn SessionIdentity,
        default_task: Option<TaskId>,
    ) -> TaskProgressTracker {
        let tracker = TaskProgressTracker::for_identity(self.progress(), identity);
        match default_task {
            Some(task_id) => tracker.with_default_task(task_id),
            None => tracker,
        }
    }

    /// An exercise flow for one task and the current learner session.
    #[must_use]
    pub fn exercise_flow(&self, identity: &dyn SessionIdentity, task_id: TaskId) -> ExerciseFlow {
        ExerciseFlow::new(self.tracker(identity, Some(task_id)))
    }
}

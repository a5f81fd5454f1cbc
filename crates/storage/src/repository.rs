use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tutor_core::model::{SessionId, TaskId, TaskProgress};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Row store for task progress, keyed by `(task_id, session_id)`.
#[async_trait]
pub trait TaskProgressRepository: Send + Sync {
    /// Fetch the progress row for a task and session, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be read or decoded.
    async fn get_progress(
        &self,
        task_id: &TaskId,
        session_id: &SessionId,
    ) -> Result<Option<TaskProgress>, StorageError>;

    /// Insert `initial` unless a row for its key exists, and return the stored row.
    ///
    /// Never creates a second row for the same key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the insert or the read-back fails.
    async fn find_or_create(&self, initial: &TaskProgress) -> Result<TaskProgress, StorageError>;

    /// Insert or overwrite the mutable fields of a progress row by key.
    ///
    /// Concurrent writers to the same key are last-write-wins.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_progress(&self, progress: &TaskProgress) -> Result<(), StorageError>;

    /// All progress rows of a session, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if rows cannot be read or decoded.
    async fn list_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<TaskProgress>, StorageError>;
}

type ProgressKey = (TaskId, SessionId);

fn key_of(progress: &TaskProgress) -> ProgressKey {
    (progress.task_id().clone(), progress.session_id().clone())
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<ProgressKey, TaskProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, across all sessions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }
}

#[async_trait]
impl TaskProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        task_id: &TaskId,
        session_id: &SessionId,
    ) -> Result<Option<TaskProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(task_id.clone(), session_id.clone())).cloned())
    }

    async fn find_or_create(&self, initial: &TaskProgress) -> Result<TaskProgress, StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .entry(key_of(initial))
            .or_insert_with(|| initial.clone())
            .clone())
    }

    async fn upsert_progress(&self, progress: &TaskProgress) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = key_of(progress);
        // Keep the original row identity and creation time, like the SQL upsert.
        let stored = match guard.get(&key) {
            Some(existing) => TaskProgress::from_persisted(
                existing.id(),
                progress.task_id().clone(),
                progress.session_id().clone(),
                progress.quiz_passed(),
                progress.exercises_completed(),
                progress.current_phase(),
                existing.created_at(),
                progress.updated_at().max(existing.created_at()),
            )
            .map_err(|e| StorageError::Serialization(e.to_string()))?,
            None => progress.clone(),
        };
        guard.insert(key, stored);
        Ok(())
    }

    async fn list_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<TaskProgress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<TaskProgress> = guard
            .values()
            .filter(|p| p.session_id() == session_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.updated_at()
                .cmp(&a.updated_at())
                .then_with(|| a.task_id().cmp(b.task_id()))
        });
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn TaskProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn TaskProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }
}

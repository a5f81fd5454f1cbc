use tutor_core::model::{SessionId, TaskId, TaskProgress};

use super::SqliteRepository;
use super::mapping::{count_to_i64, map_progress_row};
use crate::repository::{StorageError, TaskProgressRepository};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

const SELECT_COLUMNS: &str = r"
    SELECT
        id, task_id, session_id, quiz_passed, exercises_completed,
        current_phase, created_at, updated_at
    FROM task_progress
";

#[async_trait::async_trait]
impl TaskProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        task_id: &TaskId,
        session_id: &SessionId,
    ) -> Result<Option<TaskProgress>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE task_id = ?1 AND session_id = ?2");
        let row = sqlx::query(&sql)
            .bind(task_id.as_str())
            .bind(session_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn find_or_create(&self, initial: &TaskProgress) -> Result<TaskProgress, StorageError> {
        let inserted = sqlx::query(
            r"
                INSERT INTO task_progress (
                    id, task_id, session_id, quiz_passed, exercises_completed,
                    current_phase, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(task_id, session_id) DO NOTHING
            ",
        )
        .bind(initial.id().to_string())
        .bind(initial.task_id().as_str())
        .bind(initial.session_id().as_str())
        .bind(initial.quiz_passed())
        .bind(count_to_i64(initial.exercises_completed()))
        .bind(initial.current_phase().as_str())
        .bind(initial.created_at())
        .bind(initial.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let created = inserted.rows_affected() == 1;
        tracing::debug!(task_id = %initial.task_id(), created, "find_or_create task_progress");

        self.get_progress(initial.task_id(), initial.session_id())
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn upsert_progress(&self, progress: &TaskProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO task_progress (
                    id, task_id, session_id, quiz_passed, exercises_completed,
                    current_phase, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(task_id, session_id) DO UPDATE SET
                    quiz_passed = excluded.quiz_passed,
                    exercises_completed = excluded.exercises_completed,
                    current_phase = excluded.current_phase,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(progress.id().to_string())
        .bind(progress.task_id().as_str())
        .bind(progress.session_id().as_str())
        .bind(progress.quiz_passed())
        .bind(count_to_i64(progress.exercises_completed()))
        .bind(progress.current_phase().as_str())
        .bind(progress.created_at())
        .bind(progress.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<TaskProgress>, StorageError> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE session_id = ?1 ORDER BY updated_at DESC, task_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(session_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }
}

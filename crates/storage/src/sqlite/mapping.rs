use sqlx::Row;
use tutor_core::model::{ProgressId, SessionId, TaskId, TaskPhase, TaskProgress};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn count_to_i64(v: u32) -> i64 {
    i64::from(v)
}

fn count_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn parse_phase(s: &str) -> Result<TaskPhase, StorageError> {
    s.parse::<TaskPhase>().map_err(ser)
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<TaskProgress, StorageError> {
    let id: ProgressId = row
        .try_get::<String, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let task_id = TaskId::new(row.try_get::<String, _>("task_id").map_err(ser)?).map_err(ser)?;
    let session_id =
        SessionId::new(row.try_get::<String, _>("session_id").map_err(ser)?).map_err(ser)?;
    let phase_str: String = row.try_get("current_phase").map_err(ser)?;

    TaskProgress::from_persisted(
        id,
        task_id,
        session_id,
        row.try_get::<bool, _>("quiz_passed").map_err(ser)?,
        count_from_i64(
            "exercises_completed",
            row.try_get::<i64, _>("exercises_completed").map_err(ser)?,
        )?,
        parse_phase(&phase_str)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_phase_is_a_serialization_error() {
        let err = parse_phase("finished").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(count_from_i64("exercises_completed", -1).is_err());
        assert_eq!(count_from_i64("exercises_completed", 3).unwrap(), 3);
    }
}

use chrono::Duration;
use storage::repository::TaskProgressRepository;
use storage::sqlite::SqliteRepository;
use tutor_core::model::{SessionId, TaskId, TaskPhase, TaskProgress};
use tutor_core::time::fixed_now;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn fresh(task: &str, session: &str) -> TaskProgress {
    TaskProgress::new(
        TaskId::new(task).unwrap(),
        SessionId::new(session).unwrap(),
        fixed_now(),
    )
}

async fn row_count(repo: &SqliteRepository) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM task_progress")
        .fetch_one(repo.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn sqlite_find_or_create_is_idempotent() {
    let repo = connect("memdb_find_or_create").await;

    let first = repo.find_or_create(&fresh("task-1", "s1")).await.unwrap();
    let second = repo.find_or_create(&fresh("task-1", "s1")).await.unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(first.current_phase(), TaskPhase::Theory);
    assert!(!first.quiz_passed());
    assert_eq!(row_count(&repo).await, 1);
}

#[tokio::test]
async fn sqlite_upsert_persists_progress_fields() {
    let repo = connect("memdb_upsert").await;
    let created = repo.find_or_create(&fresh("task-1", "s1")).await.unwrap();

    let mut progress = created.clone();
    progress.mark_quiz_passed(fixed_now() + Duration::minutes(1));
    for _ in 0..4 {
        progress.record_exercise(fixed_now() + Duration::minutes(2));
    }
    repo.upsert_progress(&progress).await.unwrap();

    let stored = repo
        .get_progress(created.task_id(), created.session_id())
        .await
        .unwrap()
        .expect("row exists");
    assert_eq!(stored.id(), created.id());
    assert!(stored.quiz_passed());
    assert_eq!(stored.exercises_completed(), 4);
    assert_eq!(stored.current_phase(), TaskPhase::Completed);
    assert_eq!(stored.updated_at(), fixed_now() + Duration::minutes(2));
    assert_eq!(stored.created_at(), fixed_now());
}

#[tokio::test]
async fn sqlite_upsert_inserts_missing_rows() {
    let repo = connect("memdb_upsert_insert").await;

    let mut progress = fresh("task-9", "s1");
    progress.record_exercise(fixed_now());
    repo.upsert_progress(&progress).await.unwrap();

    let stored = repo
        .get_progress(progress.task_id(), progress.session_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, progress);
}

#[tokio::test]
async fn sqlite_missing_row_reads_as_none() {
    let repo = connect("memdb_missing").await;
    let missing = repo
        .get_progress(
            &TaskId::new("nope").unwrap(),
            &SessionId::new("s1").unwrap(),
        )
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn sqlite_lists_session_rows_newest_first() {
    let repo = connect("memdb_list").await;

    let older = repo.find_or_create(&fresh("task-a", "s1")).await.unwrap();
    let mut newer = repo.find_or_create(&fresh("task-b", "s1")).await.unwrap();
    repo.find_or_create(&fresh("task-a", "s2")).await.unwrap();

    newer.mark_quiz_passed(fixed_now() + Duration::hours(1));
    repo.upsert_progress(&newer).await.unwrap();

    let rows = repo
        .list_for_session(&SessionId::new("s1").unwrap())
        .await
        .unwrap();
    let tasks: Vec<&str> = rows.iter().map(|r| r.task_id().as_str()).collect();
    assert_eq!(tasks, vec!["task-b", older.task_id().as_str()]);
}

#[tokio::test]
async fn sqlite_rejects_corrupted_phase() {
    let repo = connect("memdb_corrupt").await;
    let created = repo.find_or_create(&fresh("task-1", "s1")).await.unwrap();

    sqlx::query("UPDATE task_progress SET current_phase = 'completed' WHERE id = ?1")
        .bind(created.id().to_string())
        .execute(repo.pool())
        .await
        .unwrap();

    let err = repo
        .get_progress(created.task_id(), created.session_id())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        storage::repository::StorageError::Serialization(_)
    ));
}

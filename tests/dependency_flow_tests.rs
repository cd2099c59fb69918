use dayflow_lib::db::repositories::TaskRepository;
use dayflow_lib::db::DbPool;
use dayflow_lib::error::AppResult;
use dayflow_lib::models::dependency::BlockedReason;
use dayflow_lib::models::task::{TaskCreateInput, TaskRecord, TaskStatus};
use dayflow_lib::services::dependency_service::DependencyService;
use tempfile::TempDir;

fn test_pool(dir: &TempDir) -> DbPool {
    DbPool::new(dir.path().join("dayflow-test.db")).expect("test pool")
}

fn seed_task(pool: &DbPool, title: &str, status: TaskStatus) -> AppResult<TaskRecord> {
    pool.with_connection(|conn| {
        let record = TaskRepository::insert(
            conn,
            &TaskCreateInput {
                user_id: "user-1".to_string(),
                title: title.to_string(),
                description: None,
                status: Some(status),
                priority: None,
                energy_level: None,
                focus_type: None,
                estimated_minutes: None,
                soft_deadline: None,
                hard_deadline: None,
            },
        )?;
        Ok(record)
    })
}

fn link(pool: &DbPool, task: &TaskRecord, depends_on: &TaskRecord) -> AppResult<()> {
    pool.with_connection(|conn| {
        TaskRepository::add_dependency(conn, &task.id, &depends_on.id)?;
        Ok(())
    })
}

fn active_tasks(pool: &DbPool) -> AppResult<Vec<TaskRecord>> {
    pool.with_connection(|conn| TaskRepository::find_active_for_user(conn, "user-1"))
}

#[test]
fn unblocked_tasks_resolve_as_ready() -> AppResult<()> {
    let dir = TempDir::new()?;
    let pool = test_pool(&dir);
    seed_task(&pool, "Write report", TaskStatus::Todo)?;
    seed_task(&pool, "Review report", TaskStatus::Todo)?;

    let service = DependencyService::new(pool.clone());
    let resolution = service.resolve_dependencies(active_tasks(&pool)?)?;

    assert_eq!(resolution.total_tasks, 2);
    assert_eq!(resolution.ready_count, 2);
    assert_eq!(resolution.blocked_count, 0);
    Ok(())
}

#[test]
fn incomplete_prerequisite_blocks_the_dependent() -> AppResult<()> {
    let dir = TempDir::new()?;
    let pool = test_pool(&dir);
    let draft = seed_task(&pool, "Draft", TaskStatus::InProgress)?;
    let publish = seed_task(&pool, "Publish", TaskStatus::Todo)?;
    link(&pool, &publish, &draft)?;

    let service = DependencyService::new(pool.clone());
    let resolution = service.resolve_dependencies(active_tasks(&pool)?)?;

    assert_eq!(resolution.ready_count, 1);
    assert_eq!(resolution.blocked_count, 1);
    let blocked = &resolution.blocked_tasks[0];
    assert_eq!(blocked.task.id, publish.id);
    assert_eq!(blocked.reasons, vec![BlockedReason::IncompleteDependency]);
    Ok(())
}

#[test]
fn done_prerequisite_outside_the_active_batch_unblocks() -> AppResult<()> {
    let dir = TempDir::new()?;
    let pool = test_pool(&dir);
    let draft = seed_task(&pool, "Draft", TaskStatus::Done)?;
    let publish = seed_task(&pool, "Publish", TaskStatus::Todo)?;
    link(&pool, &publish, &draft)?;

    // DONE tasks are not planning candidates, so the prerequisite must be
    // hydrated by id rather than found in the batch.
    let batch = active_tasks(&pool)?;
    assert_eq!(batch.len(), 1);

    let service = DependencyService::new(pool.clone());
    let resolution = service.resolve_dependencies(batch)?;
    assert_eq!(resolution.ready_count, 1);
    assert_eq!(resolution.ready_tasks[0].id, publish.id);
    Ok(())
}

#[test]
fn deleted_prerequisite_keeps_the_dependent_blocked() -> AppResult<()> {
    let dir = TempDir::new()?;
    let pool = test_pool(&dir);
    let publish = seed_task(&pool, "Publish", TaskStatus::Todo)?;
    pool.with_connection(|conn| {
        conn.execute(
            "INSERT INTO task_dependencies (id, task_id, depends_on_id, created_at)
             VALUES ('dep-1', ?1, 'missing-task', '2026-03-02T00:00:00+00:00')",
            [&publish.id],
        )?;
        Ok(())
    })?;

    let service = DependencyService::new(pool.clone());
    let resolution = service.resolve_dependencies(active_tasks(&pool)?)?;

    assert_eq!(resolution.ready_count, 0);
    assert_eq!(
        resolution.blocked_tasks[0].reasons,
        vec![BlockedReason::OrphanedDependency]
    );
    Ok(())
}

#[test]
fn cycle_reports_every_candidate_blocked() -> AppResult<()> {
    let dir = TempDir::new()?;
    let pool = test_pool(&dir);
    let a = seed_task(&pool, "A", TaskStatus::Todo)?;
    let b = seed_task(&pool, "B", TaskStatus::Todo)?;
    let c = seed_task(&pool, "C", TaskStatus::Todo)?;
    link(&pool, &a, &b)?;
    link(&pool, &b, &a)?;

    let service = DependencyService::new(pool.clone());
    let resolution = service.resolve_dependencies(active_tasks(&pool)?)?;

    assert_eq!(resolution.ready_count, 0);
    assert_eq!(resolution.blocked_count, 3);
    assert!(resolution
        .blocked_tasks
        .iter()
        .any(|blocked| blocked.task.id == c.id));
    assert!(resolution
        .blocked_tasks
        .iter()
        .all(|blocked| blocked.reasons == vec![BlockedReason::CircularDependency]));
    Ok(())
}

#[test]
fn self_dependency_is_rejected_at_insert() -> AppResult<()> {
    let dir = TempDir::new()?;
    let pool = test_pool(&dir);
    let task = seed_task(&pool, "Loner", TaskStatus::Todo)?;

    let result = pool.with_connection(|conn| {
        TaskRepository::add_dependency(conn, &task.id, &task.id)
    });
    assert!(result.is_err());
    Ok(())
}

use std::sync::Arc;

use dayflow_lib::db::repositories::TaskRepository;
use dayflow_lib::db::DbPool;
use dayflow_lib::error::AppResult;
use dayflow_lib::models::task::{EnergyLevel, FocusType, TaskCreateInput, TaskRecord, TaskStatus};
use dayflow_lib::services::calendar::CalendarService;
use dayflow_lib::services::dependency_service::DependencyService;
use dayflow_lib::services::planner_service::DailyPlannerService;
use tempfile::TempDir;

const PLAN_DATE: &str = "2026-03-02";

fn planner(pool: &DbPool) -> DailyPlannerService {
    DailyPlannerService::new(
        pool.clone(),
        Arc::new(DependencyService::new(pool.clone())),
        // No providers configured: the commitment list is simply empty.
        Arc::new(CalendarService::new(Vec::new())),
    )
}

struct TaskSpec<'a> {
    title: &'a str,
    priority: i64,
    energy: Option<EnergyLevel>,
    focus: Option<FocusType>,
    minutes: i64,
    hard_deadline: Option<&'a str>,
}

fn seed(pool: &DbPool, spec: TaskSpec<'_>) -> AppResult<TaskRecord> {
    pool.with_connection(|conn| {
        TaskRepository::insert(
            conn,
            &TaskCreateInput {
                user_id: "user-1".to_string(),
                title: spec.title.to_string(),
                description: None,
                status: Some(TaskStatus::Todo),
                priority: Some(spec.priority),
                energy_level: spec.energy,
                focus_type: spec.focus,
                estimated_minutes: Some(spec.minutes),
                soft_deadline: None,
                hard_deadline: spec.hard_deadline.map(|value| value.to_string()),
            },
        )
    })
}

#[tokio::test]
async fn urgent_deep_work_lands_in_the_morning_peak() -> AppResult<()> {
    let dir = TempDir::new()?;
    let pool = DbPool::new(dir.path().join("plan.db"))?;

    let urgent = seed(
        &pool,
        TaskSpec {
            title: "Finish launch review",
            priority: 5,
            energy: Some(EnergyLevel::High),
            focus: Some(FocusType::Technical),
            minutes: 60,
            hard_deadline: Some("2026-03-02T17:00:00+00:00"),
        },
    )?;
    let routine = seed(
        &pool,
        TaskSpec {
            title: "File expenses",
            priority: 1,
            energy: Some(EnergyLevel::Low),
            focus: Some(FocusType::Administrative),
            minutes: 30,
            hard_deadline: Some("2026-03-07T17:00:00+00:00"),
        },
    )?;

    let plan = planner(&pool).generate_plan("user-1", PLAN_DATE).await?;

    assert_eq!(plan.date, PLAN_DATE);
    assert_eq!(plan.blocks.len(), 2);
    assert!(plan.unscheduled_tasks.is_empty());
    assert_eq!(plan.total_scheduled_minutes, 90);

    // The urgent high-energy task takes the 09:00 morning-peak slot and a
    // perfect match on both dimensions.
    let first = &plan.blocks[0];
    assert_eq!(first.task.id, urgent.id);
    assert!(first.start_at.starts_with("2026-03-02T09:00"));
    assert_eq!(first.energy_match, 1.0);
    assert_eq!(first.focus_match, 1.0);

    // The low-energy admin task lands later, in the lunch trough.
    let second = &plan.blocks[1];
    assert_eq!(second.task.id, routine.id);
    assert!(second.start_at > first.start_at);

    assert_eq!(plan.optimization.deadline_risk, 0.0);
    assert!(plan.optimization.energy_optimization > 0.9);
    Ok(())
}

#[tokio::test]
async fn blocked_tasks_stay_off_the_plan() -> AppResult<()> {
    let dir = TempDir::new()?;
    let pool = DbPool::new(dir.path().join("plan.db"))?;

    let publish = seed(
        &pool,
        TaskSpec {
            title: "Publish notes",
            priority: 4,
            energy: None,
            focus: None,
            minutes: 30,
            hard_deadline: None,
        },
    )?;
    let draft = seed(
        &pool,
        TaskSpec {
            title: "Draft notes",
            priority: 4,
            energy: None,
            focus: None,
            minutes: 60,
            hard_deadline: None,
        },
    )?;
    pool.with_connection(|conn| {
        TaskRepository::add_dependency(conn, &publish.id, &draft.id)?;
        Ok(())
    })?;

    let plan = planner(&pool).generate_plan("user-1", PLAN_DATE).await?;

    let planned: Vec<&str> = plan.blocks.iter().map(|b| b.task.id.as_str()).collect();
    assert_eq!(planned, vec![draft.id.as_str()]);
    // Blocked tasks are filtered before scoring; they are not "unscheduled".
    assert!(plan.unscheduled_tasks.is_empty());
    Ok(())
}

#[tokio::test]
async fn a_dependency_cycle_aborts_the_whole_plan() -> AppResult<()> {
    let dir = TempDir::new()?;
    let pool = DbPool::new(dir.path().join("plan.db"))?;

    let a = seed(
        &pool,
        TaskSpec {
            title: "A",
            priority: 3,
            energy: None,
            focus: None,
            minutes: 30,
            hard_deadline: None,
        },
    )?;
    let b = seed(
        &pool,
        TaskSpec {
            title: "B",
            priority: 3,
            energy: None,
            focus: None,
            minutes: 30,
            hard_deadline: None,
        },
    )?;
    pool.with_connection(|conn| {
        TaskRepository::add_dependency(conn, &a.id, &b.id)?;
        TaskRepository::add_dependency(conn, &b.id, &a.id)?;
        Ok(())
    })?;

    let err = planner(&pool)
        .generate_plan("user-1", PLAN_DATE)
        .await
        .expect_err("cycle must abort planning");
    assert!(err.to_string().contains("circular dependency"));
    Ok(())
}

#[tokio::test]
async fn more_tasks_than_slots_overflow_into_unscheduled() -> AppResult<()> {
    let dir = TempDir::new()?;
    let pool = DbPool::new(dir.path().join("plan.db"))?;

    // Default settings yield five slots; seed seven tasks.
    for index in 0..7 {
        seed(
            &pool,
            TaskSpec {
                title: &format!("Task {index}"),
                priority: 3,
                energy: None,
                focus: None,
                minutes: 45,
                hard_deadline: None,
            },
        )?;
    }

    let plan = planner(&pool).generate_plan("user-1", PLAN_DATE).await?;

    assert_eq!(plan.blocks.len(), 5);
    assert_eq!(plan.unscheduled_tasks.len(), 2);
    assert_eq!(plan.total_scheduled_minutes, 5 * 45);
    Ok(())
}

#[tokio::test]
async fn an_invalid_date_fails_before_touching_anything() -> AppResult<()> {
    let dir = TempDir::new()?;
    let pool = DbPool::new(dir.path().join("plan.db"))?;
    assert!(planner(&pool)
        .generate_plan("user-1", "March 2nd")
        .await
        .is_err());
    Ok(())
}

use std::convert::TryFrom;

use chrono::Utc;
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::dependency::TaskDependency;
use crate::models::task::{TaskCreateInput, TaskRecord, TaskStatus};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        user_id,
        title,
        description,
        status,
        priority,
        energy_level,
        focus_type,
        estimated_minutes,
        soft_deadline,
        hard_deadline,
        created_at,
        updated_at
    FROM tasks
"#;

#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: i64,
    pub energy_level: Option<String>,
    pub focus_type: Option<String>,
    pub estimated_minutes: i64,
    pub soft_deadline: Option<String>,
    pub hard_deadline: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<&Row<'_>> for TaskRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            status: row.get("status")?,
            priority: row.get("priority")?,
            energy_level: row.get("energy_level")?,
            focus_type: row.get("focus_type")?,
            estimated_minutes: row.get("estimated_minutes")?,
            soft_deadline: row.get("soft_deadline")?,
            hard_deadline: row.get("hard_deadline")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl TaskRow {
    pub fn into_record(self) -> AppResult<TaskRecord> {
        let status = self
            .status
            .parse()
            .map_err(|err: String| AppError::database(err))?;
        let energy_level = self
            .energy_level
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|err: String| AppError::database(err))?;
        let focus_type = self
            .focus_type
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|err: String| AppError::database(err))?;

        Ok(TaskRecord {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            status,
            priority: self.priority,
            energy_level,
            focus_type,
            estimated_minutes: self.estimated_minutes,
            soft_deadline: self.soft_deadline,
            hard_deadline: self.hard_deadline,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct TaskRepository;

impl TaskRepository {
    pub fn insert(conn: &Connection, input: &TaskCreateInput) -> AppResult<TaskRecord> {
        let priority = input.priority.unwrap_or(3);
        if !(1..=5).contains(&priority) {
            return Err(AppError::validation("priority must be between 1 and 5"));
        }

        let record = TaskRecord {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id.clone(),
            title: input.title.clone(),
            description: input.description.clone(),
            status: input.status.unwrap_or(TaskStatus::Todo),
            priority,
            energy_level: input.energy_level,
            focus_type: input.focus_type,
            estimated_minutes: input.estimated_minutes.unwrap_or(60),
            soft_deadline: input.soft_deadline.clone(),
            hard_deadline: input.hard_deadline.clone(),
            created_at: Utc::now().to_rfc3339(),
            updated_at: Utc::now().to_rfc3339(),
        };

        conn.execute(
            r#"
                INSERT INTO tasks (
                    id, user_id, title, description, status, priority,
                    energy_level, focus_type, estimated_minutes,
                    soft_deadline, hard_deadline, created_at, updated_at
                ) VALUES (
                    :id, :user_id, :title, :description, :status, :priority,
                    :energy_level, :focus_type, :estimated_minutes,
                    :soft_deadline, :hard_deadline, :created_at, :updated_at
                )
            "#,
            named_params! {
                ":id": record.id,
                ":user_id": record.user_id,
                ":title": record.title,
                ":description": record.description,
                ":status": record.status.to_string(),
                ":priority": record.priority,
                ":energy_level": record.energy_level.map(|level| level.to_string()),
                ":focus_type": record.focus_type.map(|focus| focus.to_string()),
                ":estimated_minutes": record.estimated_minutes,
                ":soft_deadline": record.soft_deadline,
                ":hard_deadline": record.hard_deadline,
                ":created_at": record.created_at,
                ":updated_at": record.updated_at,
            },
        )?;

        Ok(record)
    }

    pub fn find_by_id(conn: &Connection, task_id: &str) -> AppResult<Option<TaskRecord>> {
        let sql = format!("{} WHERE id = ?1", BASE_SELECT);
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row([task_id], |row| TaskRow::try_from(row))
            .optional()?;

        row.map(TaskRow::into_record).transpose()
    }

    /// All tasks for a user that are candidates for planning, i.e. neither
    /// DONE nor BLOCKED.
    pub fn find_active_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<TaskRecord>> {
        let sql = format!(
            "{} WHERE user_id = ?1 AND status NOT IN ('DONE', 'BLOCKED') ORDER BY created_at ASC",
            BASE_SELECT
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map([user_id], |row| TaskRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(TaskRow::into_record).collect()
    }

    pub fn set_status(conn: &Connection, task_id: &str, status: TaskStatus) -> AppResult<()> {
        let rows_affected = conn.execute(
            "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
            (status.to_string(), Utc::now().to_rfc3339(), task_id),
        )?;

        if rows_affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    pub fn add_dependency(
        conn: &Connection,
        task_id: &str,
        depends_on_id: &str,
    ) -> AppResult<TaskDependency> {
        if task_id == depends_on_id {
            return Err(AppError::validation("task cannot depend on itself"));
        }

        let dependency = TaskDependency {
            id: Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            depends_on_id: depends_on_id.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };

        conn.execute(
            "INSERT INTO task_dependencies (id, task_id, depends_on_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            (
                &dependency.id,
                &dependency.task_id,
                &dependency.depends_on_id,
                &dependency.created_at,
            ),
        )?;

        Ok(dependency)
    }

    /// Prerequisite edges for one task, oldest first.
    pub fn list_dependencies(conn: &Connection, task_id: &str) -> AppResult<Vec<TaskDependency>> {
        let mut stmt = conn.prepare(
            "SELECT id, task_id, depends_on_id, created_at
             FROM task_dependencies
             WHERE task_id = ?1
             ORDER BY created_at ASC",
        )?;

        let dependencies = stmt
            .query_map([task_id], |row| {
                Ok(TaskDependency {
                    id: row.get(0)?,
                    task_id: row.get(1)?,
                    depends_on_id: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(dependencies)
    }
}

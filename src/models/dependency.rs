use serde::{Deserialize, Serialize};

use crate::models::task::TaskRecord;

/// Directed edge: `task_id` cannot start until `depends_on_id` is DONE.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDependency {
    pub id: String,
    pub task_id: String,
    pub depends_on_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReason {
    IncompleteDependency,
    OrphanedDependency,
    CircularDependency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedTask {
    pub task: TaskRecord,
    pub reasons: Vec<BlockedReason>,
}

/// Diagnostic view of a task batch: who can start now and who is waiting,
/// with per-task reasons for UI consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyResolution {
    pub ready_tasks: Vec<TaskRecord>,
    pub blocked_tasks: Vec<BlockedTask>,
    pub total_tasks: usize,
    pub ready_count: usize,
    pub blocked_count: usize,
}

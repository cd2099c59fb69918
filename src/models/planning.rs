use serde::{Deserialize, Serialize};

use crate::models::task::{EnergyLevel, FocusType, TaskRecord};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CalendarSource {
    Google,
    Microsoft,
}

impl std::fmt::Display for CalendarSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalendarSource::Google => write!(f, "google"),
            CalendarSource::Microsoft => write!(f, "microsoft"),
        }
    }
}

/// Where a busy slot came from, for slots sourced from an external calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotProvenance {
    pub provider: CalendarSource,
    pub event_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub all_day: bool,
}

/// A contiguous interval `[start_at, end_at)` within the day. Generated open
/// slots have `is_available = true`; calendar commitments carry provenance
/// and are unavailable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_at: String,
    pub end_at: String,
    pub energy_level: EnergyLevel,
    #[serde(default)]
    pub preferred_focus_types: Vec<FocusType>,
    pub is_available: bool,
    #[serde(default)]
    pub source: Option<SlotProvenance>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredTask {
    pub task: TaskRecord,
    pub priority_score: f64,
    pub deadline_score: f64,
    pub energy_score: f64,
    pub focus_score: f64,
    pub total_score: f64,
}

/// A (task, slot) binding produced by the assigner. Match scores are in
/// `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAssignment {
    pub task_id: String,
    pub slot_index: usize,
    pub energy_match: f64,
    pub focus_match: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBlock {
    pub task: TaskRecord,
    pub slot: TimeSlot,
    pub slot_index: usize,
    pub energy_match: f64,
    pub focus_match: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetrics {
    pub energy_optimization: f64,
    pub focus_optimization: f64,
    pub deadline_risk: f64,
}

/// Task payload shared by schedule blocks and the unscheduled list in the
/// output contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTaskDto {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_level: Option<EnergyLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_type: Option<FocusType>,
    pub estimated_minutes: i64,
    pub priority: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_deadline: Option<String>,
}

impl PlannedTaskDto {
    pub fn from_task(task: &TaskRecord) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            energy_level: task.energy_level,
            focus_type: task.focus_type,
            estimated_minutes: task.estimated_minutes,
            priority: task.priority,
            hard_deadline: task.hard_deadline.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBlockDto {
    pub task: PlannedTaskDto,
    pub start_at: String,
    pub end_at: String,
    pub energy_match: f64,
    pub focus_match: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlanResult {
    pub date: String,
    pub blocks: Vec<ScheduleBlockDto>,
    pub unscheduled_tasks: Vec<PlannedTaskDto>,
    pub total_scheduled_minutes: i64,
    pub optimization: PlanMetrics,
}

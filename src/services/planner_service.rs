use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tracing::info;

use crate::db::repositories::{SettingsRepository, TaskRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::dependency::DependencyResolution;
use crate::models::planning::{
    DailyPlanResult, PlannedTaskDto, ScheduleBlockDto, ScoredTask, TimeSlot,
};
use crate::models::settings::UserSettings;
use crate::models::task::TaskRecord;
use crate::services::calendar::CalendarService;
use crate::services::dependency_service::DependencyService;
use crate::services::{plan_assembler, slot_assigner, slot_generator, task_scorer};

pub struct DailyPlannerService {
    db: DbPool,
    dependencies: Arc<DependencyService>,
    calendar: Arc<CalendarService>,
}

impl DailyPlannerService {
    pub fn new(
        db: DbPool,
        dependencies: Arc<DependencyService>,
        calendar: Arc<CalendarService>,
    ) -> Self {
        Self {
            db,
            dependencies,
            calendar,
        }
    }

    fn parse_plan_date(date: &str) -> AppResult<NaiveDate> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|err| {
            AppError::validation_with_details(
                "plan date must be YYYY-MM-DD",
                json!({"value": date, "error": err.to_string()}),
            )
        })
    }

    /// Load the user's settings, creating and persisting the defaults on
    /// first use.
    fn load_settings(&self, user_id: &str) -> AppResult<UserSettings> {
        self.db.with_connection(|conn| {
            if let Some(settings) = SettingsRepository::find_by_user(conn, user_id)? {
                return Ok(settings);
            }
            let defaults = UserSettings::default_for(user_id);
            SettingsRepository::upsert(conn, &defaults)?;
            Ok(defaults)
        })
    }

    fn load_candidates(&self, user_id: &str) -> AppResult<Vec<TaskRecord>> {
        self.db
            .with_connection(|conn| TaskRepository::find_active_for_user(conn, user_id))
    }

    /// Build the full plan for one user and one day.
    ///
    /// A dependency cycle aborts the whole run; everything else degrades
    /// (unreachable calendars become empty commitment lists, tasks without a
    /// slot land in the unscheduled list).
    pub async fn generate_plan(&self, user_id: &str, date: &str) -> AppResult<DailyPlanResult> {
        let plan_date = Self::parse_plan_date(date)?;

        // Connections are not held across awaits; load everything up front.
        let candidates = self.load_candidates(user_id)?;
        let settings = self.load_settings(user_id)?;

        let graph = self.dependencies.build_graph(candidates)?;
        graph.detect_cycle()?;
        let ready = graph.ready_tasks();

        // Kick off the calendar fetch so it runs while scoring happens.
        let calendar = Arc::clone(&self.calendar);
        let calendar_user = user_id.to_string();
        let commitments_handle =
            tokio::spawn(async move { calendar.get_commitments(&calendar_user, plan_date).await });

        let scored = task_scorer::score_and_rank(&ready, plan_date);
        let commitments = commitments_handle
            .await
            .map_err(|err| AppError::other(format!("calendar fetch task failed: {err}")))?;
        let slots = slot_generator::generate(plan_date, &settings, &commitments)?;
        let assignments = slot_assigner::assign(&scored, &slots)?;
        let blocks = plan_assembler::assemble(&assignments, &scored, &slots)?;
        let metrics = plan_assembler::compute_metrics(&blocks, &scored);

        let unscheduled: Vec<&ScoredTask> = scored
            .iter()
            .filter(|entry| !assignments.contains_key(&entry.task.id))
            .collect();
        let total_scheduled_minutes: i64 = blocks
            .iter()
            .map(|block| block.task.estimated_minutes)
            .sum();

        info!(
            target: "app::planner",
            user_id,
            date,
            candidates = graph.candidates().len(),
            ready = ready.len(),
            commitments = commitments.len(),
            open_slots = slots.len(),
            scheduled = blocks.len(),
            unscheduled = unscheduled.len(),
            "daily plan generated"
        );

        Ok(DailyPlanResult {
            date: date.to_string(),
            blocks: blocks
                .iter()
                .map(|block| ScheduleBlockDto {
                    task: PlannedTaskDto::from_task(&block.task),
                    start_at: block.slot.start_at.clone(),
                    end_at: block.slot.end_at.clone(),
                    energy_match: block.energy_match,
                    focus_match: block.focus_match,
                    reason: block.reason.clone(),
                })
                .collect(),
            unscheduled_tasks: unscheduled
                .iter()
                .map(|entry| PlannedTaskDto::from_task(&entry.task))
                .collect(),
            total_scheduled_minutes,
            optimization: metrics,
        })
    }

    /// Readiness diagnostics without building a plan. Unlike
    /// [`generate_plan`](Self::generate_plan) a cycle does not fail the call;
    /// it reports the whole batch blocked instead.
    pub fn resolve_dependencies(&self, user_id: &str) -> AppResult<DependencyResolution> {
        let candidates = self.load_candidates(user_id)?;
        self.dependencies.resolve_dependencies(candidates)
    }

    /// The day's calendar commitments as busy slots, mainly for surfacing a
    /// schedule preview.
    pub async fn commitments(&self, user_id: &str, date: &str) -> AppResult<Vec<TimeSlot>> {
        let plan_date = Self::parse_plan_date(date)?;
        Ok(self.calendar.get_commitments(user_id, plan_date).await)
    }
}

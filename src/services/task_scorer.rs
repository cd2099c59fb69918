use chrono::NaiveDate;
use tracing::warn;

use crate::models::planning::ScoredTask;
use crate::models::task::{EnergyLevel, FocusType, TaskRecord};
use crate::services::schedule_utils;

// Fixed weights keep scoring deterministic and testable.
const PRIORITY_WEIGHT: f64 = 8.0;
const DEADLINE_CEILING: f64 = 30.0;
const DEADLINE_DECAY_PER_DAY: f64 = 5.0;

fn energy_component(level: Option<EnergyLevel>) -> f64 {
    match level.unwrap_or(EnergyLevel::Medium) {
        EnergyLevel::High => 20.0,
        EnergyLevel::Medium => 15.0,
        EnergyLevel::Low => 10.0,
    }
}

fn focus_component(focus: Option<FocusType>) -> f64 {
    match focus.unwrap_or(FocusType::Administrative) {
        FocusType::Creative => 8.0,
        FocusType::Technical => 8.0,
        FocusType::Administrative => 6.0,
        FocusType::Social => 10.0,
    }
}

fn deadline_component(task: &TaskRecord, target_date: NaiveDate) -> f64 {
    let Some(raw) = task.hard_deadline.as_deref() else {
        return 0.0;
    };

    let deadline = match schedule_utils::parse_datetime(raw) {
        Ok(dt) => dt,
        Err(_) => {
            warn!(
                target: "app::planner",
                task_id = %task.id,
                value = raw,
                "unparseable hard deadline ignored for scoring"
            );
            return 0.0;
        }
    };

    let days_until = (deadline.date_naive() - target_date).num_days().max(0) as f64;
    (DEADLINE_CEILING - days_until * DEADLINE_DECAY_PER_DAY).max(0.0)
}

/// Composite priority score. Pure and deterministic for given inputs.
pub fn score_task(task: &TaskRecord, target_date: NaiveDate) -> ScoredTask {
    let priority_score = task.priority as f64 * PRIORITY_WEIGHT;
    let deadline_score = deadline_component(task, target_date);
    let energy_score = energy_component(task.energy_level);
    let focus_score = focus_component(task.focus_type);

    ScoredTask {
        task: task.clone(),
        priority_score,
        deadline_score,
        energy_score,
        focus_score,
        total_score: priority_score + deadline_score + energy_score + focus_score,
    }
}

/// Scores every task and sorts descending by total. The sort is stable so
/// ties keep input order and plans stay reproducible.
pub fn score_and_rank(tasks: &[TaskRecord], target_date: NaiveDate) -> Vec<ScoredTask> {
    let mut scored: Vec<ScoredTask> = tasks
        .iter()
        .map(|task| score_task(task, target_date))
        .collect();
    scored.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}

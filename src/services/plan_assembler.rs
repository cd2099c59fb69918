use std::collections::{HashMap, HashSet};

use crate::error::AppResult;
use crate::models::planning::{PlanMetrics, ScheduleAssignment, ScheduleBlock, ScoredTask, TimeSlot};
use crate::services::schedule_utils;

/// Join assignments back to their tasks and slots, ordered by slot start so
/// the plan reads chronologically.
pub fn assemble(
    assignments: &HashMap<String, ScheduleAssignment>,
    scored: &[ScoredTask],
    slots: &[TimeSlot],
) -> AppResult<Vec<ScheduleBlock>> {
    let mut blocks = Vec::with_capacity(assignments.len());

    for entry in scored {
        let Some(assignment) = assignments.get(&entry.task.id) else {
            continue;
        };
        let Some(slot) = slots.get(assignment.slot_index) else {
            continue;
        };
        blocks.push(ScheduleBlock {
            task: entry.task.clone(),
            slot: slot.clone(),
            slot_index: assignment.slot_index,
            energy_match: assignment.energy_match,
            focus_match: assignment.focus_match,
            reason: assignment.reason.clone(),
        });
    }

    // Parse once per block, then sort on the parsed instant.
    let mut keyed: Vec<(chrono::DateTime<chrono::FixedOffset>, ScheduleBlock)> = blocks
        .into_iter()
        .map(|block| {
            let start = schedule_utils::parse_datetime(&block.slot.start_at)?;
            Ok((start, block))
        })
        .collect::<AppResult<_>>()?;
    keyed.sort_by_key(|(start, _)| *start);

    Ok(keyed.into_iter().map(|(_, block)| block).collect())
}

/// Plan quality summary. Optimization values are the mean of per-block match
/// scores; deadline risk is the fraction of urgent deadline tasks (hard
/// deadline, priority above 3) that did not make it onto the plan.
pub fn compute_metrics(blocks: &[ScheduleBlock], scored: &[ScoredTask]) -> PlanMetrics {
    let (energy_optimization, focus_optimization) = if blocks.is_empty() {
        (0.0, 0.0)
    } else {
        let count = blocks.len() as f64;
        (
            blocks.iter().map(|b| b.energy_match).sum::<f64>() / count,
            blocks.iter().map(|b| b.focus_match).sum::<f64>() / count,
        )
    };

    let scheduled: HashSet<&str> = blocks.iter().map(|b| b.task.id.as_str()).collect();
    let urgent: Vec<&ScoredTask> = scored
        .iter()
        .filter(|entry| entry.task.hard_deadline.is_some() && entry.task.priority > 3)
        .collect();
    let deadline_risk = if urgent.is_empty() {
        0.0
    } else {
        let placed = urgent
            .iter()
            .filter(|entry| scheduled.contains(entry.task.id.as_str()))
            .count();
        1.0 - placed as f64 / urgent.len() as f64
    };

    PlanMetrics {
        energy_optimization,
        focus_optimization,
        deadline_risk,
    }
}

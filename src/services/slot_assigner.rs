use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::AppResult;
use crate::models::planning::{ScheduleAssignment, ScoredTask, TimeSlot};
use crate::models::task::TaskRecord;
use crate::services::schedule_utils;

const ENERGY_WEIGHT: f64 = 0.4;
const FOCUS_WEIGHT: f64 = 0.3;
const DURATION_WEIGHT: f64 = 0.3;

const EXACT_MATCH: f64 = 1.0;
const ENERGY_MISMATCH: f64 = 0.3;
const FOCUS_MISMATCH: f64 = 0.4;
const ATTRIBUTE_ABSENT: f64 = 0.5;

fn energy_match(task: &TaskRecord, slot: &TimeSlot) -> f64 {
    match task.energy_level {
        Some(level) if level == slot.energy_level => EXACT_MATCH,
        Some(_) => ENERGY_MISMATCH,
        None => ATTRIBUTE_ABSENT,
    }
}

fn focus_match(task: &TaskRecord, slot: &TimeSlot) -> f64 {
    match task.focus_type {
        Some(focus) if slot.preferred_focus_types.contains(&focus) => EXACT_MATCH,
        Some(_) => FOCUS_MISMATCH,
        None => ATTRIBUTE_ABSENT,
    }
}

fn duration_fit(task: &TaskRecord, slot: &TimeSlot) -> AppResult<f64> {
    let slot_start = schedule_utils::parse_datetime(&slot.start_at)?;
    let slot_end = schedule_utils::parse_datetime(&slot.end_at)?;
    let slot_minutes = schedule_utils::duration_minutes(slot_start, slot_end)?;
    if slot_minutes == 0 {
        return Ok(0.0);
    }
    let excess = task.estimated_minutes - slot_minutes;
    if excess <= 0 {
        Ok(1.0)
    } else {
        Ok((1.0 - excess as f64 / slot_minutes as f64).max(0.0))
    }
}

fn describe(task: &TaskRecord, slot: &TimeSlot, energy: f64, focus: f64, duration: f64) -> String {
    let energy_phrase = if energy >= EXACT_MATCH {
        format!("{} energy matches the slot", slot.energy_level)
    } else if energy == ATTRIBUTE_ABSENT {
        "no energy preference".to_string()
    } else {
        format!(
            "energy compromise ({} task in a {} slot)",
            task.energy_level.map(|l| l.to_string()).unwrap_or_default(),
            slot.energy_level
        )
    };
    let focus_phrase = if focus >= EXACT_MATCH {
        "preferred focus type".to_string()
    } else if focus == ATTRIBUTE_ABSENT {
        "no focus preference".to_string()
    } else {
        "off-focus slot".to_string()
    };
    let duration_phrase = if duration >= 1.0 {
        "fits the slot".to_string()
    } else {
        "overruns the slot".to_string()
    };
    format!("{energy_phrase}; {focus_phrase}; {duration_phrase}")
}

/// Greedy assignment: walk the ranked tasks in order, giving each the
/// best-fitting unused available slot. Tasks left without a slot are simply
/// absent from the map; they surface as unscheduled downstream.
pub fn assign(
    scored: &[ScoredTask],
    slots: &[TimeSlot],
) -> AppResult<HashMap<String, ScheduleAssignment>> {
    let mut assignments = HashMap::new();
    let mut used: HashSet<usize> = HashSet::new();

    for entry in scored {
        let mut best_index: Option<usize> = None;
        let mut best_fitness = -1.0;
        let mut best_parts = (0.0, 0.0, 0.0);

        for (index, slot) in slots.iter().enumerate() {
            if !slot.is_available || used.contains(&index) {
                continue;
            }

            let energy = energy_match(&entry.task, slot);
            let focus = focus_match(&entry.task, slot);
            let duration = duration_fit(&entry.task, slot)?;
            let fitness =
                ENERGY_WEIGHT * energy + FOCUS_WEIGHT * focus + DURATION_WEIGHT * duration;

            // Strict comparison keeps the first slot on ties.
            if fitness > best_fitness {
                best_fitness = fitness;
                best_index = Some(index);
                best_parts = (energy, focus, duration);
            }
        }

        if let Some(index) = best_index {
            let (energy, focus, duration) = best_parts;
            used.insert(index);
            assignments.insert(
                entry.task.id.clone(),
                ScheduleAssignment {
                    task_id: entry.task.id.clone(),
                    slot_index: index,
                    energy_match: energy,
                    focus_match: focus,
                    reason: describe(&entry.task, &slots[index], energy, focus, duration),
                },
            );
        } else {
            debug!(
                target: "app::planner",
                task_id = %entry.task.id,
                "no open slot left for task"
            );
        }
    }

    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{EnergyLevel, FocusType, TaskStatus};
    use crate::services::task_scorer;
    use chrono::NaiveDate;

    fn task(id: &str) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            title: format!("Task {}", id),
            description: None,
            status: TaskStatus::Todo,
            priority: 3,
            energy_level: None,
            focus_type: None,
            estimated_minutes: 60,
            soft_deadline: None,
            hard_deadline: None,
            created_at: "2026-03-02T00:00:00+00:00".to_string(),
            updated_at: "2026-03-02T00:00:00+00:00".to_string(),
        }
    }

    fn scored(task: TaskRecord) -> ScoredTask {
        task_scorer::score_task(&task, NaiveDate::from_ymd_opt(2026, 3, 2).expect("date"))
    }

    fn slot(start: &str, end: &str, energy: EnergyLevel, focus: Vec<FocusType>) -> TimeSlot {
        TimeSlot {
            start_at: format!("2026-03-02T{start}:00+00:00"),
            end_at: format!("2026-03-02T{end}:00+00:00"),
            energy_level: energy,
            preferred_focus_types: focus,
            is_available: true,
            source: None,
        }
    }

    #[test]
    fn matching_task_takes_the_matching_slot() -> AppResult<()> {
        let mut deep = task("deep");
        deep.energy_level = Some(EnergyLevel::High);
        deep.focus_type = Some(FocusType::Technical);

        let slots = vec![
            slot("13:00", "14:00", EnergyLevel::Low, vec![FocusType::Social]),
            slot(
                "09:00",
                "10:30",
                EnergyLevel::High,
                vec![FocusType::Creative, FocusType::Technical],
            ),
        ];

        let assignments = assign(&[scored(deep)], &slots)?;
        let assignment = assignments.get("deep").expect("assigned");
        assert_eq!(assignment.slot_index, 1);
        assert_eq!(assignment.energy_match, 1.0);
        assert_eq!(assignment.focus_match, 1.0);
        Ok(())
    }

    #[test]
    fn a_slot_is_never_double_booked() -> AppResult<()> {
        let slots = vec![slot(
            "09:00",
            "10:30",
            EnergyLevel::High,
            vec![FocusType::Technical],
        )];
        let assignments = assign(&[scored(task("a")), scored(task("b"))], &slots)?;
        assert_eq!(assignments.len(), 1);
        assert!(assignments.contains_key("a"));
        assert!(!assignments.contains_key("b"));
        Ok(())
    }

    #[test]
    fn ties_keep_the_first_slot_found() -> AppResult<()> {
        let slots = vec![
            slot("09:00", "10:00", EnergyLevel::Medium, vec![]),
            slot("11:00", "12:00", EnergyLevel::Medium, vec![]),
        ];
        let assignments = assign(&[scored(task("a"))], &slots)?;
        assert_eq!(assignments.get("a").expect("assigned").slot_index, 0);
        Ok(())
    }

    #[test]
    fn absent_attributes_score_as_neutral() -> AppResult<()> {
        let slots = vec![slot(
            "09:00",
            "10:00",
            EnergyLevel::High,
            vec![FocusType::Technical],
        )];
        let assignments = assign(&[scored(task("a"))], &slots)?;
        let assignment = assignments.get("a").expect("assigned");
        assert_eq!(assignment.energy_match, 0.5);
        assert_eq!(assignment.focus_match, 0.5);
        Ok(())
    }

    #[test]
    fn overlong_tasks_are_penalized_but_not_excluded() -> AppResult<()> {
        let mut long = task("long");
        long.estimated_minutes = 120;

        // 60-minute slot: excess 60 over 60 yields a duration fit of 0.
        let short_slot = vec![slot("09:00", "10:00", EnergyLevel::Medium, vec![])];
        let assignments = assign(&[scored(long)], &short_slot)?;
        assert!(assignments.contains_key("long"));
        Ok(())
    }

    #[test]
    fn unavailable_slots_are_skipped() -> AppResult<()> {
        let mut busy = slot("09:00", "10:00", EnergyLevel::High, vec![]);
        busy.is_available = false;
        let assignments = assign(&[scored(task("a"))], &[busy])?;
        assert!(assignments.is_empty());
        Ok(())
    }
}

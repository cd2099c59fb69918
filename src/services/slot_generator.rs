use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike};
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::models::planning::TimeSlot;
use crate::models::settings::UserSettings;
use crate::models::task::{EnergyLevel, FocusType};
use crate::services::schedule_utils;

// A slot shorter than this is not worth offering.
const MIN_SLOT_MINUTES: i64 = 30;

fn break_minutes(slot_minutes: i64) -> i64 {
    match slot_minutes {
        m if m <= 60 => 10,
        m if m <= 90 => 15,
        m if m <= 120 => 20,
        _ => 25,
    }
}

/// Day-phase energy curve: ramp-up before the morning peak, a dip into the
/// lunch trough, recovery into the afternoon peak, decline into the evening.
/// The two peaks take the user's configured levels.
fn energy_for_hour(hour: u32, settings: &UserSettings) -> EnergyLevel {
    match hour {
        6..=8 => EnergyLevel::Medium,
        9..=10 => settings.morning_energy,
        11 => EnergyLevel::Medium,
        12 => EnergyLevel::Low,
        13 => EnergyLevel::Medium,
        14..=15 => settings.afternoon_energy,
        16..=17 => EnergyLevel::Medium,
        _ => EnergyLevel::Low,
    }
}

/// Preferred focus types per (energy level, hour of day): demanding creative
/// and technical work at high energy, administrative and social work at low.
fn preferred_focus(energy: EnergyLevel, hour: u32) -> Vec<FocusType> {
    match (energy, hour) {
        (EnergyLevel::High, h) if h < 12 => vec![FocusType::Creative, FocusType::Technical],
        (EnergyLevel::High, _) => vec![FocusType::Technical, FocusType::Creative],
        (EnergyLevel::Medium, h) if h < 12 => {
            vec![FocusType::Technical, FocusType::Administrative]
        }
        (EnergyLevel::Medium, _) => vec![FocusType::Administrative, FocusType::Social],
        (EnergyLevel::Low, _) => vec![FocusType::Administrative, FocusType::Social],
    }
}

fn overlaps_commitment(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    commitments: &[TimeSlot],
) -> AppResult<bool> {
    for commitment in commitments {
        let c_start = schedule_utils::parse_datetime(&commitment.start_at)?;
        let c_end = schedule_utils::parse_datetime(&commitment.end_at)?;
        if schedule_utils::overlaps(start, end, c_start, c_end)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Produce the day's open slots for the user's work window, net of calendar
/// commitments. Only available slots are returned.
pub fn generate(
    date: NaiveDate,
    settings: &UserSettings,
    commitments: &[TimeSlot],
) -> AppResult<Vec<TimeSlot>> {
    let work_start = schedule_utils::parse_work_time(&settings.work_start_time).unwrap_or_else(|| {
        warn!(
            target: "app::planner",
            value = %settings.work_start_time,
            "malformed work start time, falling back to 09:00"
        );
        NaiveTime::from_hms_opt(9, 0, 0).expect("09:00 must be valid")
    });
    let work_end = schedule_utils::parse_work_time(&settings.work_end_time).unwrap_or_else(|| {
        warn!(
            target: "app::planner",
            value = %settings.work_end_time,
            "malformed work end time, falling back to 17:00"
        );
        NaiveTime::from_hms_opt(17, 0, 0).expect("17:00 must be valid")
    });

    let window_start = schedule_utils::at_time(date, work_start);
    let window_end = schedule_utils::at_time(date, work_end);
    if window_end <= window_start {
        warn!(
            target: "app::planner",
            start = %settings.work_start_time,
            end = %settings.work_end_time,
            "inverted work window, no slots generated"
        );
        return Ok(Vec::new());
    }

    let session_minutes = if settings.focus_session_length > 0 {
        settings.focus_session_length
    } else {
        crate::models::settings::DEFAULT_SESSION_MINUTES
    };

    let mut slots = Vec::new();
    let mut cursor = window_start;
    while cursor < window_end {
        let remaining = schedule_utils::duration_minutes(cursor, window_end)?;
        let slot_minutes = remaining.min(session_minutes);
        if slot_minutes < MIN_SLOT_MINUTES {
            break;
        }

        let slot_end = schedule_utils::add_minutes(cursor, slot_minutes)?;
        let hour = cursor.hour();
        let energy = energy_for_hour(hour, settings);
        let is_available = !overlaps_commitment(cursor, slot_end, commitments)?;

        if is_available {
            slots.push(TimeSlot {
                start_at: schedule_utils::format_datetime(cursor),
                end_at: schedule_utils::format_datetime(slot_end),
                energy_level: energy,
                preferred_focus_types: preferred_focus(energy, hour),
                is_available: true,
                source: None,
            });
        }

        cursor = schedule_utils::add_minutes(slot_end, break_minutes(slot_minutes))?;
    }

    debug!(
        target: "app::planner",
        date = %date,
        open_slots = slots.len(),
        commitments = commitments.len(),
        "time slots generated"
    );

    Ok(slots)
}

use chrono::{
    offset::LocalResult, DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone,
};
use serde_json::json;

use crate::error::{AppError, AppResult};

pub fn parse_datetime(value: &str) -> AppResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|err| {
        AppError::validation_with_details(
            "invalid datetime format",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn format_datetime(dt: DateTime<FixedOffset>) -> String {
    dt.to_rfc3339()
}

pub fn add_minutes(dt: DateTime<FixedOffset>, minutes: i64) -> AppResult<DateTime<FixedOffset>> {
    dt.checked_add_signed(Duration::minutes(minutes))
        .ok_or_else(|| AppError::validation("datetime arithmetic out of range"))
}

pub fn duration_minutes(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> AppResult<i64> {
    let total = end.signed_duration_since(start).num_minutes();
    if total < 0 {
        Err(AppError::validation("end time must follow start time"))
    } else {
        Ok(total)
    }
}

pub fn overlaps(
    a_start: DateTime<FixedOffset>,
    a_end: DateTime<FixedOffset>,
    b_start: DateTime<FixedOffset>,
    b_end: DateTime<FixedOffset>,
) -> AppResult<bool> {
    if a_end <= a_start || b_end <= b_start {
        return Err(AppError::validation("invalid time range"));
    }
    Ok(a_start < b_end && b_start < a_end)
}

/// `HH:MM`, 24h clock. Returns None on anything malformed so callers can
/// apply their own fallback policy.
pub fn parse_work_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

pub fn utc_offset() -> FixedOffset {
    FixedOffset::east_opt(0).expect("UTC offset must exist")
}

pub fn at_time(date: NaiveDate, time: NaiveTime) -> DateTime<FixedOffset> {
    let offset = utc_offset();
    match offset.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(first, _) => first,
        LocalResult::None => offset
            .from_utc_datetime(&date.and_time(NaiveTime::from_hms_opt(0, 0, 0).expect("midnight"))),
    }
}

/// Full-day window `[00:00:00.000, 23:59:59.999)`, the normalized form of an
/// all-day event.
pub fn day_bounds(date: NaiveDate) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let start = at_time(date, NaiveTime::from_hms_opt(0, 0, 0).expect("midnight"));
    let end = at_time(
        date,
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999).expect("end of day"),
    );
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_work_time_accepts_hh_mm_only() {
        assert_eq!(
            parse_work_time("08:30"),
            NaiveTime::from_hms_opt(8, 30, 0)
        );
        assert_eq!(parse_work_time(" 17:00 "), NaiveTime::from_hms_opt(17, 0, 0));
        assert_eq!(parse_work_time("25:00"), None);
        assert_eq!(parse_work_time("9am"), None);
        assert_eq!(parse_work_time(""), None);
    }

    #[test]
    fn overlaps_uses_half_open_intervals() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).expect("date");
        let nine = at_time(date, NaiveTime::from_hms_opt(9, 0, 0).expect("time"));
        let ten = at_time(date, NaiveTime::from_hms_opt(10, 0, 0).expect("time"));
        let eleven = at_time(date, NaiveTime::from_hms_opt(11, 0, 0).expect("time"));

        assert!(!overlaps(nine, ten, ten, eleven).expect("adjacent"));
        assert!(overlaps(nine, eleven, ten, eleven).expect("contained"));
        assert!(overlaps(nine, ten, nine, eleven).expect("nested"));
    }

    #[test]
    fn day_bounds_cover_the_whole_day() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).expect("date");
        let (start, end) = day_bounds(date);
        assert_eq!(format_datetime(start), "2026-03-02T00:00:00+00:00");
        assert!(format_datetime(end).starts_with("2026-03-02T23:59:59.999"));
    }
}

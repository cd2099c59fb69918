use std::sync::Arc;

use chrono::NaiveDate;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::CalendarErrorCode;
use crate::models::planning::{CalendarSource, SlotProvenance, TimeSlot};
use crate::models::task::{EnergyLevel, FocusType};
use crate::services::schedule_utils;

pub mod providers;

pub use providers::{CalendarProvider, GoogleCalendarProvider, MicrosoftGraphProvider, RawEvent};

const DEDUP_TOLERANCE_MINUTES: i64 = 5;
const DEFAULT_CALENDAR_ID: &str = "primary";

// Title keywords driving energy inference.
const HIGH_ENERGY_HINTS: &[&str] = &["focus", "deep work", "coding"];
const LOW_ENERGY_HINTS: &[&str] = &["all hands", "town hall", "presentation"];
const HIGH_ENERGY_ATTENDEE_MAX: usize = 0;
const LOW_ENERGY_ATTENDEE_MIN: usize = 9;

// Keyword vocabularies driving focus-type inference, matched against title,
// description, and provider categories.
const TECHNICAL_HINTS: &[&str] = &[
    "code", "coding", "deploy", "debug", "engineering", "architecture", "incident", "review",
];
const CREATIVE_HINTS: &[&str] = &[
    "design", "brainstorm", "ideation", "workshop", "writing", "sketch",
];
const ADMINISTRATIVE_HINTS: &[&str] = &[
    "admin", "expense", "report", "planning", "budget", "email", "paperwork",
];
const SOCIAL_HINTS: &[&str] = &[
    "standup", "sync", "1:1", "one-on-one", "meeting", "coffee", "lunch", "interview",
];

/// Bounded exponential backoff with jitter. Injectable so tests can run with
/// millisecond delays; the default matches production policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub jitter_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            jitter_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following failed attempt `attempt` (1-based):
    /// `min(2^(attempt-1) * base + random(0, jitter), max)`.
    fn delay_ms_after(&self, attempt: u32) -> u64 {
        let exponential = self
            .base_delay_ms
            .saturating_mul(1u64 << (attempt.saturating_sub(1)).min(20));
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..self.jitter_ms)
        } else {
            0
        };
        exponential.saturating_add(jitter).min(self.max_delay_ms)
    }
}

fn infer_energy(event: &RawEvent) -> EnergyLevel {
    let title = event.title.as_deref().unwrap_or("").to_lowercase();
    if event.attendee_count == HIGH_ENERGY_ATTENDEE_MAX
        || HIGH_ENERGY_HINTS.iter().any(|hint| title.contains(hint))
    {
        return EnergyLevel::High;
    }
    if event.attendee_count >= LOW_ENERGY_ATTENDEE_MIN
        || LOW_ENERGY_HINTS.iter().any(|hint| title.contains(hint))
    {
        return EnergyLevel::Low;
    }
    EnergyLevel::Medium
}

fn infer_focus_types(event: &RawEvent) -> Vec<FocusType> {
    let mut haystack = event.title.clone().unwrap_or_default();
    if let Some(description) = &event.description {
        haystack.push(' ');
        haystack.push_str(description);
    }
    for category in &event.categories {
        haystack.push(' ');
        haystack.push_str(category);
    }
    let haystack = haystack.to_lowercase();

    let vocabularies: [(&[&str], FocusType); 4] = [
        (TECHNICAL_HINTS, FocusType::Technical),
        (CREATIVE_HINTS, FocusType::Creative),
        (ADMINISTRATIVE_HINTS, FocusType::Administrative),
        (SOCIAL_HINTS, FocusType::Social),
    ];

    let mut matched = Vec::new();
    for (hints, focus) in vocabularies {
        if hints.iter().any(|hint| haystack.contains(hint)) {
            matched.push(focus);
        }
    }

    if matched.is_empty() {
        matched.push(if event.attendee_count > 0 {
            FocusType::Social
        } else {
            FocusType::Technical
        });
    }
    matched
}

/// Turn one provider event into a busy slot. All-day events expand to the
/// full-day window; malformed bounds drop the event with a warning and never
/// fail the batch.
fn normalize_event(event: &RawEvent, source: CalendarSource, date: NaiveDate) -> Option<TimeSlot> {
    let (start_at, end_at) = if event.all_day {
        let day = event
            .start_at
            .as_deref()
            .and_then(|raw| raw.get(..10))
            .and_then(|raw| raw.parse::<NaiveDate>().ok())
            .unwrap_or(date);
        let (start, end) = schedule_utils::day_bounds(day);
        (
            schedule_utils::format_datetime(start),
            schedule_utils::format_datetime(end),
        )
    } else {
        let raw_start = event.start_at.as_deref()?;
        let raw_end = event.end_at.as_deref();
        let parsed_start = schedule_utils::parse_datetime(raw_start).ok();
        let parsed_end = raw_end.and_then(|raw| schedule_utils::parse_datetime(raw).ok());

        match (parsed_start, parsed_end) {
            (Some(start), Some(end)) if end > start => (
                schedule_utils::format_datetime(start),
                schedule_utils::format_datetime(end),
            ),
            _ => {
                warn!(
                    target: "app::calendar",
                    provider = %source,
                    event_id = %event.id,
                    start = ?event.start_at,
                    end = ?event.end_at,
                    "dropping event with missing or inverted bounds"
                );
                return None;
            }
        }
    };

    let energy = infer_energy(event);
    Some(TimeSlot {
        start_at,
        end_at,
        energy_level: energy,
        preferred_focus_types: infer_focus_types(event),
        is_available: false,
        source: Some(SlotProvenance {
            provider: source,
            event_id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            all_day: event.all_day,
        }),
    })
}

fn within_tolerance(a: &TimeSlot, b: &TimeSlot) -> bool {
    let bounds = (
        schedule_utils::parse_datetime(&a.start_at),
        schedule_utils::parse_datetime(&a.end_at),
        schedule_utils::parse_datetime(&b.start_at),
        schedule_utils::parse_datetime(&b.end_at),
    );
    match bounds {
        (Ok(a_start), Ok(a_end), Ok(b_start), Ok(b_end)) => {
            let start_delta = (a_start - b_start).num_minutes().abs();
            let end_delta = (a_end - b_end).num_minutes().abs();
            start_delta <= DEDUP_TOLERANCE_MINUTES && end_delta <= DEDUP_TOLERANCE_MINUTES
        }
        _ => false,
    }
}

/// Cross-provider dedup: two slots from *different* providers whose bounds
/// both land within the tolerance are the same real-world event; same
/// provider pairs are never collapsed.
fn dedupe_cross_provider(slots: Vec<TimeSlot>) -> Vec<TimeSlot> {
    let mut kept: Vec<TimeSlot> = Vec::new();
    for slot in slots {
        let duplicate = kept.iter().any(|existing| {
            let providers_differ = match (&existing.source, &slot.source) {
                (Some(a), Some(b)) => a.provider != b.provider,
                _ => false,
            };
            providers_differ && within_tolerance(existing, &slot)
        });
        if duplicate {
            debug!(
                target: "app::calendar",
                event_id = %slot.source.as_ref().map(|s| s.event_id.as_str()).unwrap_or("<unknown>"),
                "cross-provider duplicate collapsed"
            );
        } else {
            kept.push(slot);
        }
    }
    kept
}

pub struct CalendarService {
    providers: Vec<Arc<dyn CalendarProvider>>,
    retry: RetryPolicy,
}

impl CalendarService {
    pub fn new(providers: Vec<Arc<dyn CalendarProvider>>) -> Self {
        Self {
            providers,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(
        providers: Vec<Arc<dyn CalendarProvider>>,
        retry: RetryPolicy,
    ) -> Self {
        Self { providers, retry }
    }

    /// Fetch the day's commitments from every provider. Never fails: each
    /// provider degrades to an empty contribution on exhausted retries or a
    /// non-retryable error, and a total blackout yields `[]`.
    pub async fn get_commitments(&self, user_id: &str, date: NaiveDate) -> Vec<TimeSlot> {
        let (window_start, window_end) = schedule_utils::day_bounds(date);
        let start = schedule_utils::format_datetime(window_start);
        let end = schedule_utils::format_datetime(window_end);

        // Fire every provider without waiting on its siblings; a slow or
        // failing provider must not hold back the others.
        let mut handles = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let retry = self.retry.clone();
            let user_id = user_id.to_string();
            let start = start.clone();
            let end = end.clone();
            handles.push(tokio::spawn(async move {
                fetch_provider_with_retry(provider, &retry, &user_id, &start, &end, date).await
            }));
        }

        let mut merged = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(slots) => merged.extend(slots),
                Err(err) => {
                    warn!(target: "app::calendar", error = %err, "provider task panicked");
                }
            }
        }

        let deduped = dedupe_cross_provider(merged);
        info!(
            target: "app::calendar",
            user_id,
            date = %date,
            commitments = deduped.len(),
            "calendar commitments resolved"
        );
        deduped
    }
}

async fn fetch_provider_with_retry(
    provider: Arc<dyn CalendarProvider>,
    retry: &RetryPolicy,
    user_id: &str,
    start: &str,
    end: &str,
    date: NaiveDate,
) -> Vec<TimeSlot> {
    let source = provider.source();

    for attempt in 1..=retry.max_attempts {
        debug!(
            target: "app::calendar",
            provider = %source,
            attempt,
            "fetching provider events"
        );

        match provider
            .fetch_events(user_id, DEFAULT_CALENDAR_ID, start, end)
            .await
        {
            Ok(events) => {
                return events
                    .iter()
                    .filter_map(|event| normalize_event(event, source, date))
                    .collect();
            }
            Err(err) => {
                let retryable = err
                    .calendar_code()
                    .map(CalendarErrorCode::is_retryable)
                    .unwrap_or(false);

                if !retryable || attempt == retry.max_attempts {
                    warn!(
                        target: "app::calendar",
                        provider = %source,
                        attempt,
                        retryable,
                        error = %err,
                        "provider fetch abandoned, degrading to empty"
                    );
                    return Vec::new();
                }

                let delay = retry.delay_ms_after(attempt);
                warn!(
                    target: "app::calendar",
                    provider = %source,
                    attempt,
                    delay_ms = delay,
                    error = %err,
                    "provider fetch failed, retrying"
                );
                sleep(std::time::Duration::from_millis(delay)).await;
            }
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str) -> RawEvent {
        RawEvent {
            id: id.to_string(),
            title: None,
            description: None,
            start_at: Some("2026-03-02T10:00:00+00:00".to_string()),
            end_at: Some("2026-03-02T11:00:00+00:00".to_string()),
            all_day: false,
            attendee_count: 3,
            categories: Vec::new(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).expect("date")
    }

    fn slot(provider: CalendarSource, id: &str, start: &str, end: &str) -> TimeSlot {
        TimeSlot {
            start_at: start.to_string(),
            end_at: end.to_string(),
            energy_level: EnergyLevel::Medium,
            preferred_focus_types: vec![],
            is_available: false,
            source: Some(SlotProvenance {
                provider,
                event_id: id.to_string(),
                title: None,
                description: None,
                all_day: false,
            }),
        }
    }

    #[test]
    fn solo_events_and_focus_titles_infer_high_energy() {
        let mut solo = event("a");
        solo.attendee_count = 0;
        assert_eq!(infer_energy(&solo), EnergyLevel::High);

        let mut titled = event("b");
        titled.title = Some("Deep Work: quarterly essay".to_string());
        assert_eq!(infer_energy(&titled), EnergyLevel::High);
    }

    #[test]
    fn crowded_or_broadcast_events_infer_low_energy() {
        let mut crowd = event("a");
        crowd.attendee_count = 12;
        assert_eq!(infer_energy(&crowd), EnergyLevel::Low);

        let mut town_hall = event("b");
        town_hall.title = Some("Company Town Hall".to_string());
        assert_eq!(infer_energy(&town_hall), EnergyLevel::Low);

        assert_eq!(infer_energy(&event("c")), EnergyLevel::Medium);
    }

    #[test]
    fn focus_vocabularies_match_title_and_categories() {
        let mut review = event("a");
        review.title = Some("Incident review".to_string());
        assert!(infer_focus_types(&review).contains(&FocusType::Technical));

        let mut tagged = event("b");
        tagged.categories = vec!["Brainstorm".to_string()];
        assert!(infer_focus_types(&tagged).contains(&FocusType::Creative));

        // No keywords, attendees present: defaults to social.
        assert_eq!(infer_focus_types(&event("c")), vec![FocusType::Social]);

        let mut solo = event("d");
        solo.attendee_count = 0;
        assert_eq!(infer_focus_types(&solo), vec![FocusType::Technical]);
    }

    #[test]
    fn all_day_events_normalize_to_the_full_day() {
        let mut offsite = event("a");
        offsite.all_day = true;
        offsite.start_at = Some("2026-03-02".to_string());
        offsite.end_at = Some("2026-03-03".to_string());

        let slot = normalize_event(&offsite, CalendarSource::Google, date()).expect("slot");
        assert_eq!(slot.start_at, "2026-03-02T00:00:00+00:00");
        assert!(slot.end_at.starts_with("2026-03-02T23:59:59.999"));
        assert!(!slot.is_available);
        assert!(slot.source.as_ref().expect("provenance").all_day);
    }

    #[test]
    fn malformed_events_are_dropped_individually() {
        let mut missing_end = event("a");
        missing_end.end_at = None;
        assert!(normalize_event(&missing_end, CalendarSource::Google, date()).is_none());

        let mut inverted = event("b");
        inverted.start_at = Some("2026-03-02T11:00:00+00:00".to_string());
        inverted.end_at = Some("2026-03-02T10:00:00+00:00".to_string());
        assert!(normalize_event(&inverted, CalendarSource::Google, date()).is_none());

        assert!(normalize_event(&event("c"), CalendarSource::Google, date()).is_some());
    }

    #[test]
    fn cross_provider_duplicates_within_tolerance_collapse() {
        let slots = vec![
            slot(
                CalendarSource::Google,
                "g-1",
                "2026-03-02T10:00:00+00:00",
                "2026-03-02T11:00:00+00:00",
            ),
            slot(
                CalendarSource::Microsoft,
                "m-1",
                "2026-03-02T10:03:00+00:00",
                "2026-03-02T11:04:00+00:00",
            ),
        ];
        let deduped = dedupe_cross_provider(slots);
        assert_eq!(deduped.len(), 1);
        assert_eq!(
            deduped[0].source.as_ref().expect("provenance").event_id,
            "g-1"
        );
    }

    #[test]
    fn events_six_minutes_apart_are_distinct() {
        let slots = vec![
            slot(
                CalendarSource::Google,
                "g-1",
                "2026-03-02T10:00:00+00:00",
                "2026-03-02T11:00:00+00:00",
            ),
            slot(
                CalendarSource::Microsoft,
                "m-1",
                "2026-03-02T10:06:00+00:00",
                "2026-03-02T11:00:00+00:00",
            ),
        ];
        assert_eq!(dedupe_cross_provider(slots).len(), 2);
    }

    #[test]
    fn same_provider_pairs_are_never_deduplicated() {
        let slots = vec![
            slot(
                CalendarSource::Google,
                "g-1",
                "2026-03-02T10:00:00+00:00",
                "2026-03-02T11:00:00+00:00",
            ),
            slot(
                CalendarSource::Google,
                "g-2",
                "2026-03-02T10:00:00+00:00",
                "2026-03-02T11:00:00+00:00",
            ),
        ];
        assert_eq!(dedupe_cross_provider(slots).len(), 2);
    }
}

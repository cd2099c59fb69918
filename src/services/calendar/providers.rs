use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::StatusCode;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{AppError, AppResult, CalendarErrorCode};
use crate::models::planning::CalendarSource;

/// Provider-neutral event shape. Each provider maps its own JSON into this
/// before the adapter normalizes it into a busy slot.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub all_day: bool,
    pub attendee_count: usize,
    pub categories: Vec<String>,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    fn source(&self) -> CalendarSource;

    async fn fetch_events(
        &self,
        user_id: &str,
        calendar_id: &str,
        start: &str,
        end: &str,
    ) -> AppResult<Vec<RawEvent>>;
}

fn map_http_status(status: StatusCode) -> CalendarErrorCode {
    match status {
        StatusCode::UNAUTHORIZED => CalendarErrorCode::AuthExpired,
        StatusCode::FORBIDDEN => CalendarErrorCode::PermissionDenied,
        StatusCode::NOT_FOUND => CalendarErrorCode::IntegrationNotConfigured,
        StatusCode::TOO_MANY_REQUESTS => CalendarErrorCode::RateLimited,
        StatusCode::REQUEST_TIMEOUT => CalendarErrorCode::Timeout,
        status if status.is_server_error() => CalendarErrorCode::ServerError,
        _ => CalendarErrorCode::ApiError,
    }
}

fn error_from_reqwest(err: reqwest::Error, provider: CalendarSource) -> AppError {
    let code = if err.is_timeout() {
        CalendarErrorCode::Timeout
    } else if err.is_connect() {
        CalendarErrorCode::NetworkError
    } else {
        CalendarErrorCode::ApiError
    };
    AppError::calendar(code, provider.to_string(), err.to_string())
}

fn build_client(provider: CalendarSource) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .pool_max_idle_per_host(2)
        .build()
        .map_err(|err| {
            AppError::other(format!(
                "failed to build {provider} calendar HTTP client: {err}"
            ))
        })
}

/// Google Calendar v3 `events.list` shape: `items[]` with `summary`,
/// `start`/`end` carrying either `dateTime` (timed) or `date` (all-day).
pub struct GoogleCalendarProvider {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl GoogleCalendarProvider {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            client: build_client(CalendarSource::Google)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        })
    }

    fn parse_item(item: &JsonValue) -> RawEvent {
        let start = item.get("start");
        let end = item.get("end");
        let all_day = start
            .and_then(|bound| bound.get("date"))
            .is_some();

        let bound_to_string = |bound: Option<&JsonValue>| -> Option<String> {
            let bound = bound?;
            bound
                .get("dateTime")
                .or_else(|| bound.get("date"))
                .and_then(|value| value.as_str())
                .map(|value| value.to_string())
        };

        RawEvent {
            id: item
                .get("id")
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string(),
            title: item
                .get("summary")
                .and_then(|value| value.as_str())
                .map(|value| value.to_string()),
            description: item
                .get("description")
                .and_then(|value| value.as_str())
                .map(|value| value.to_string()),
            start_at: bound_to_string(start),
            end_at: bound_to_string(end),
            all_day,
            attendee_count: item
                .get("attendees")
                .and_then(|value| value.as_array())
                .map(|attendees| attendees.len())
                .unwrap_or(0),
            categories: Vec::new(),
        }
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarProvider {
    fn source(&self) -> CalendarSource {
        CalendarSource::Google
    }

    async fn fetch_events(
        &self,
        _user_id: &str,
        calendar_id: &str,
        start: &str,
        end: &str,
    ) -> AppResult<Vec<RawEvent>> {
        let url = format!("{}/calendars/{}/events", self.base_url, calendar_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .query(&[("timeMin", start), ("timeMax", end), ("singleEvents", "true")])
            .send()
            .await
            .map_err(|err| error_from_reqwest(err, CalendarSource::Google))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::calendar(
                map_http_status(status),
                CalendarSource::Google.to_string(),
                format!("events request returned {}", status.as_u16()),
            ));
        }

        let body: JsonValue = response.json().await.map_err(|err| {
            AppError::calendar(
                CalendarErrorCode::ApiError,
                CalendarSource::Google.to_string(),
                format!("unreadable events response: {err}"),
            )
        })?;

        let events: Vec<RawEvent> = body
            .get("items")
            .and_then(|value| value.as_array())
            .map(|items| items.iter().map(Self::parse_item).collect())
            .unwrap_or_default();

        debug!(
            target: "app::calendar",
            provider = %CalendarSource::Google,
            events = events.len(),
            "events fetched"
        );

        Ok(events)
    }
}

/// Microsoft Graph `calendarView` shape: `value[]` with `subject`,
/// `bodyPreview`, `isAllDay`, and offset-less `start.dateTime`/`end.dateTime`
/// paired with a `timeZone` field (requested as UTC here).
pub struct MicrosoftGraphProvider {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl MicrosoftGraphProvider {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            client: build_client(CalendarSource::Microsoft)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        })
    }

    /// Graph emits naive datetimes like `2026-03-02T10:00:00.0000000`;
    /// reinterpret them as UTC RFC3339.
    fn graph_datetime(bound: Option<&JsonValue>) -> Option<String> {
        let raw = bound?
            .get("dateTime")
            .and_then(|value| value.as_str())?;
        if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.to_rfc3339());
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| format!("{}+00:00", naive.format("%Y-%m-%dT%H:%M:%S%.3f")))
    }

    fn parse_item(item: &JsonValue) -> RawEvent {
        RawEvent {
            id: item
                .get("id")
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string(),
            title: item
                .get("subject")
                .and_then(|value| value.as_str())
                .map(|value| value.to_string()),
            description: item
                .get("bodyPreview")
                .and_then(|value| value.as_str())
                .map(|value| value.to_string()),
            start_at: Self::graph_datetime(item.get("start")),
            end_at: Self::graph_datetime(item.get("end")),
            all_day: item
                .get("isAllDay")
                .and_then(|value| value.as_bool())
                .unwrap_or(false),
            attendee_count: item
                .get("attendees")
                .and_then(|value| value.as_array())
                .map(|attendees| attendees.len())
                .unwrap_or(0),
            categories: item
                .get("categories")
                .and_then(|value| value.as_array())
                .map(|categories| {
                    categories
                        .iter()
                        .filter_map(|value| value.as_str())
                        .map(|value| value.to_string())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl CalendarProvider for MicrosoftGraphProvider {
    fn source(&self) -> CalendarSource {
        CalendarSource::Microsoft
    }

    async fn fetch_events(
        &self,
        user_id: &str,
        _calendar_id: &str,
        start: &str,
        end: &str,
    ) -> AppResult<Vec<RawEvent>> {
        let url = format!("{}/users/{}/calendarView", self.base_url, user_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .header("Prefer", "outlook.timezone=\"UTC\"")
            .query(&[("startDateTime", start), ("endDateTime", end)])
            .send()
            .await
            .map_err(|err| error_from_reqwest(err, CalendarSource::Microsoft))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::calendar(
                map_http_status(status),
                CalendarSource::Microsoft.to_string(),
                format!("calendarView request returned {}", status.as_u16()),
            ));
        }

        let body: JsonValue = response.json().await.map_err(|err| {
            AppError::calendar(
                CalendarErrorCode::ApiError,
                CalendarSource::Microsoft.to_string(),
                format!("unreadable calendarView response: {err}"),
            )
        })?;

        let events: Vec<RawEvent> = body
            .get("value")
            .and_then(|value| value.as_array())
            .map(|items| items.iter().map(Self::parse_item).collect())
            .unwrap_or_default();

        debug!(
            target: "app::calendar",
            provider = %CalendarSource::Microsoft,
            events = events.len(),
            "events fetched"
        );

        Ok(events)
    }
}

use std::fmt;

use rusqlite;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

/// Classification of calendar provider failures. Retryable codes are subject
/// to the adapter's backoff policy; the rest abort a provider's fetch on the
/// first occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarErrorCode {
    AuthExpired,
    PermissionDenied,
    IntegrationNotConfigured,
    ApiError,
    RateLimited,
    ServerError,
    NetworkError,
    Timeout,
}

impl CalendarErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            CalendarErrorCode::AuthExpired => "AUTH_EXPIRED",
            CalendarErrorCode::PermissionDenied => "PERMISSION_DENIED",
            CalendarErrorCode::IntegrationNotConfigured => "INTEGRATION_NOT_CONFIGURED",
            CalendarErrorCode::ApiError => "API_ERROR",
            CalendarErrorCode::RateLimited => "RATE_LIMITED",
            CalendarErrorCode::ServerError => "SERVER_ERROR",
            CalendarErrorCode::NetworkError => "NETWORK_ERROR",
            CalendarErrorCode::Timeout => "TIMEOUT",
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            CalendarErrorCode::RateLimited
                | CalendarErrorCode::ServerError
                | CalendarErrorCode::NetworkError
                | CalendarErrorCode::Timeout
        )
    }
}

impl fmt::Display for CalendarErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {message}")]
    Database { message: String },

    #[error("record not found")]
    NotFound,

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("calendar provider {provider}: {message}")]
    Calendar {
        code: CalendarErrorCode,
        provider: String,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation {
            message,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            details: Some(details),
        }
    }

    pub fn calendar(
        code: CalendarErrorCode,
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let provider = provider.into();
        let message = message.into();
        warn!(
            target: "app::calendar",
            code = %code,
            %provider,
            retryable = code.is_retryable(),
            %message
        );
        AppError::Calendar {
            code,
            provider,
            message,
        }
    }

    pub fn calendar_code(&self) -> Option<CalendarErrorCode> {
        match self {
            AppError::Calendar { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn not_found() -> Self {
        warn!(target: "app::database", "resource not found");
        AppError::NotFound
    }

    pub fn database(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::database", %message, "database error");
        AppError::Database { message }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        use rusqlite::Error::{QueryReturnedNoRows, SqliteFailure};
        use rusqlite::ErrorCode;

        match &error {
            QueryReturnedNoRows => AppError::not_found(),
            SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
                AppError::validation("uniqueness or constraint violation")
            }
            _ => {
                error!(target: "app::database", error = ?error, "sqlite error");
                AppError::database(error.to_string())
            }
        }
    }
}

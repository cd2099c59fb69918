use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::task::{EnergyLevel, FocusType};

pub const DEFAULT_WORK_START: &str = "09:00";
pub const DEFAULT_WORK_END: &str = "17:00";
pub const DEFAULT_SESSION_MINUTES: i64 = 90;

/// Per-user planning preferences. Created lazily with defaults on the first
/// planning request for a user that has none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub user_id: String,
    pub morning_energy: EnergyLevel,
    pub afternoon_energy: EnergyLevel,
    /// `HH:MM`, 24h clock.
    pub work_start_time: String,
    pub work_end_time: String,
    pub focus_session_length: i64,
    #[serde(default)]
    pub preferred_focus_types: Vec<FocusType>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserSettings {
    pub fn default_for(user_id: &str) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            user_id: user_id.to_string(),
            morning_energy: EnergyLevel::High,
            afternoon_energy: EnergyLevel::Medium,
            work_start_time: DEFAULT_WORK_START.to_string(),
            work_end_time: DEFAULT_WORK_END.to_string(),
            focus_session_length: DEFAULT_SESSION_MINUTES,
            preferred_focus_types: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

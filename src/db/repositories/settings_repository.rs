use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::settings::UserSettings;
use crate::models::task::FocusType;

#[derive(Debug, Clone)]
pub struct UserSettingsRow {
    pub user_id: String,
    pub morning_energy: String,
    pub afternoon_energy: String,
    pub work_start_time: String,
    pub work_end_time: String,
    pub focus_session_length: i64,
    pub preferred_focus_types: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<&Row<'_>> for UserSettingsRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            morning_energy: row.get("morning_energy")?,
            afternoon_energy: row.get("afternoon_energy")?,
            work_start_time: row.get("work_start_time")?,
            work_end_time: row.get("work_end_time")?,
            focus_session_length: row.get("focus_session_length")?,
            preferred_focus_types: row.get("preferred_focus_types")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl UserSettingsRow {
    pub fn into_record(self) -> AppResult<UserSettings> {
        let morning_energy = self
            .morning_energy
            .parse()
            .map_err(|err: String| AppError::database(err))?;
        let afternoon_energy = self
            .afternoon_energy
            .parse()
            .map_err(|err: String| AppError::database(err))?;
        let preferred_focus_types: Vec<FocusType> =
            serde_json::from_str(&self.preferred_focus_types)?;

        Ok(UserSettings {
            user_id: self.user_id,
            morning_energy,
            afternoon_energy,
            work_start_time: self.work_start_time,
            work_end_time: self.work_end_time,
            focus_session_length: self.focus_session_length,
            preferred_focus_types,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub struct SettingsRepository;

impl SettingsRepository {
    pub fn find_by_user(conn: &Connection, user_id: &str) -> AppResult<Option<UserSettings>> {
        let mut stmt = conn.prepare(
            "SELECT user_id, morning_energy, afternoon_energy, work_start_time,
                    work_end_time, focus_session_length, preferred_focus_types,
                    created_at, updated_at
             FROM user_settings WHERE user_id = ?1",
        )?;

        let row = stmt
            .query_row([user_id], |row| UserSettingsRow::try_from(row))
            .optional()?;

        row.map(UserSettingsRow::into_record).transpose()
    }

    pub fn upsert(conn: &Connection, settings: &UserSettings) -> AppResult<()> {
        let preferred = serde_json::to_string(&settings.preferred_focus_types)?;
        conn.execute(
            r#"
                INSERT INTO user_settings (
                    user_id, morning_energy, afternoon_energy, work_start_time,
                    work_end_time, focus_session_length, preferred_focus_types,
                    created_at, updated_at
                ) VALUES (
                    :user_id, :morning_energy, :afternoon_energy, :work_start_time,
                    :work_end_time, :focus_session_length, :preferred_focus_types,
                    :created_at, :updated_at
                )
                ON CONFLICT(user_id) DO UPDATE SET
                    morning_energy = excluded.morning_energy,
                    afternoon_energy = excluded.afternoon_energy,
                    work_start_time = excluded.work_start_time,
                    work_end_time = excluded.work_end_time,
                    focus_session_length = excluded.focus_session_length,
                    preferred_focus_types = excluded.preferred_focus_types,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":user_id": settings.user_id,
                ":morning_energy": settings.morning_energy.to_string(),
                ":afternoon_energy": settings.afternoon_energy.to_string(),
                ":work_start_time": settings.work_start_time,
                ":work_end_time": settings.work_end_time,
                ":focus_session_length": settings.focus_session_length,
                ":preferred_focus_types": preferred,
                ":created_at": settings.created_at,
                ":updated_at": settings.updated_at,
            },
        )?;

        Ok(())
    }
}

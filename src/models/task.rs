use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    Done,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "TODO"),
            TaskStatus::InProgress => write!(f, "IN_PROGRESS"),
            TaskStatus::Blocked => write!(f, "BLOCKED"),
            TaskStatus::Done => write!(f, "DONE"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "BLOCKED" => Ok(TaskStatus::Blocked),
            "DONE" => Ok(TaskStatus::Done),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

/// Coarse cognitive-capacity tag shared by tasks and time slots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergyLevel {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnergyLevel::High => write!(f, "HIGH"),
            EnergyLevel::Medium => write!(f, "MEDIUM"),
            EnergyLevel::Low => write!(f, "LOW"),
        }
    }
}

impl std::str::FromStr for EnergyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(EnergyLevel::High),
            "MEDIUM" => Ok(EnergyLevel::Medium),
            "LOW" => Ok(EnergyLevel::Low),
            _ => Err(format!("Invalid energy level: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FocusType {
    Creative,
    Technical,
    Administrative,
    Social,
}

impl std::fmt::Display for FocusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FocusType::Creative => write!(f, "CREATIVE"),
            FocusType::Technical => write!(f, "TECHNICAL"),
            FocusType::Administrative => write!(f, "ADMINISTRATIVE"),
            FocusType::Social => write!(f, "SOCIAL"),
        }
    }
}

impl std::str::FromStr for FocusType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATIVE" => Ok(FocusType::Creative),
            "TECHNICAL" => Ok(FocusType::Technical),
            "ADMINISTRATIVE" => Ok(FocusType::Administrative),
            "SOCIAL" => Ok(FocusType::Social),
            _ => Err(format!("Invalid focus type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    /// Integer 1-5, 5 is most important.
    pub priority: i64,
    pub energy_level: Option<EnergyLevel>,
    pub focus_type: Option<FocusType>,
    pub estimated_minutes: i64,
    pub soft_deadline: Option<String>,
    pub hard_deadline: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateInput {
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub energy_level: Option<EnergyLevel>,
    #[serde(default)]
    pub focus_type: Option<FocusType>,
    #[serde(default)]
    pub estimated_minutes: Option<i64>,
    #[serde(default)]
    pub soft_deadline: Option<String>,
    #[serde(default)]
    pub hard_deadline: Option<String>,
}

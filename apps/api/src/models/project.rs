use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Pipeline stage of a project. Set by back-office action only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Lead,
    Design,
    Construction,
    Retention,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 6] = [
        ProjectStatus::Lead,
        ProjectStatus::Design,
        ProjectStatus::Construction,
        ProjectStatus::Retention,
        ProjectStatus::Completed,
        ProjectStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Lead => "LEAD",
            ProjectStatus::Design => "DESIGN",
            ProjectStatus::Construction => "CONSTRUCTION",
            ProjectStatus::Retention => "RETENTION",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// Completed and cancelled projects no longer show up as active work.
    pub fn is_active(&self) -> bool {
        !matches!(self, ProjectStatus::Completed | ProjectStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub name: String,
    pub client_id: Option<Uuid>,
    pub client_name: String,
    pub status: String,
    pub progress: i32,
    pub description: String,
    pub started_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

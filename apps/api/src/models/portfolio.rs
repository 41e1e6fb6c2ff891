use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortfolioItemRow {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub image_url: Option<String>,
    pub description: String,
    pub completed_on: Option<NaiveDate>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

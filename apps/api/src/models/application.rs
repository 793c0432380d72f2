use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CollegeApplicationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institution_id: i32,
    pub status: String,
    pub deadline: Option<NaiveDate>,
    pub notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScholarshipApplicationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub scholarship_id: Uuid,
    pub status: String,
    pub notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A postsecondary institution keyed by its IPEDS UNITID.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InstitutionRow {
    pub id: i32,
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub website: Option<String>,
    /// public | private_nonprofit | private_for_profit
    pub control: String,
    pub acceptance_rate: Option<f64>,
    pub tuition_in_state: Option<i32>,
    pub tuition_out_of_state: Option<i32>,
    pub enrollment: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScholarshipRow {
    pub id: Uuid,
    pub name: String,
    pub provider: String,
    pub amount: Option<i32>,
    pub deadline: Option<NaiveDate>,
    pub description: Option<String>,
    pub min_gpa: Option<f64>,
    pub url: Option<String>,
}

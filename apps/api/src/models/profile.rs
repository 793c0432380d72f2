use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Where a profile value came from. User-entered values are never
/// overwritten by resume inference without explicit consent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    User,
    Resume,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EducationRecord {
    pub institution: String,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub gpa: Option<f64>,
    pub graduation_year: Option<i32>,
    pub source: FieldSource,
}

/// Skills compare case-insensitively across all of Unicode, not just ASCII.
pub fn same_skill(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Scalar profile fields tracked in `field_sources`.
pub const SCALAR_FIELDS: &[&str] = &[
    "full_name",
    "email",
    "phone",
    "location",
    "high_school",
    "gpa",
    "graduation_year",
    "intended_major",
];

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub high_school: Option<String>,
    pub gpa: Option<f64>,
    pub graduation_year: Option<i32>,
    pub intended_major: Option<String>,
    pub skills: Vec<String>,
    pub education: Json<Vec<EducationRecord>>,
    pub field_sources: Json<BTreeMap<String, FieldSource>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub high_school: Option<String>,
    pub gpa: Option<f64>,
    pub graduation_year: Option<i32>,
    pub intended_major: Option<String>,
    pub skills: Vec<String>,
    pub education: Vec<EducationRecord>,
    pub field_sources: BTreeMap<String, FieldSource>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            full_name: None,
            email: None,
            phone: None,
            location: None,
            high_school: None,
            gpa: None,
            graduation_year: None,
            intended_major: None,
            skills: Vec::new(),
            education: Vec::new(),
            field_sources: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Provenance of a scalar field. A populated field with no recorded
    /// source is treated as user-entered.
    pub fn source_of(&self, field: &str) -> Option<FieldSource> {
        self.field_sources.get(field).copied().or_else(|| {
            self.has_value(field).then_some(FieldSource::User)
        })
    }

    pub fn has_value(&self, field: &str) -> bool {
        match field {
            "full_name" => self.full_name.is_some(),
            "email" => self.email.is_some(),
            "phone" => self.phone.is_some(),
            "location" => self.location.is_some(),
            "high_school" => self.high_school.is_some(),
            "gpa" => self.gpa.is_some(),
            "graduation_year" => self.graduation_year.is_some(),
            "intended_major" => self.intended_major.is_some(),
            _ => false,
        }
    }
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: row.user_id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            location: row.location,
            high_school: row.high_school,
            gpa: row.gpa,
            graduation_year: row.graduation_year,
            intended_major: row.intended_major,
            skills: row.skills,
            education: row.education.0,
            field_sources: row.field_sources.0,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeUploadRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub document_kind: String,
    pub s3_key: String,
    pub char_count: i32,
    pub inferred: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsourced_value_counts_as_user() {
        let mut p = UserProfile::empty(Uuid::new_v4());
        p.full_name = Some("Ada Lovelace".into());
        assert_eq!(p.source_of("full_name"), Some(FieldSource::User));
        assert_eq!(p.source_of("phone"), None);
    }

    #[test]
    fn test_recorded_source_wins() {
        let mut p = UserProfile::empty(Uuid::new_v4());
        p.gpa = Some(3.5);
        p.field_sources.insert("gpa".into(), FieldSource::Resume);
        assert_eq!(p.source_of("gpa"), Some(FieldSource::Resume));
    }

    #[test]
    fn test_same_skill_ignores_unicode_case() {
        assert!(same_skill("Español", "ESPAÑOL"));
        assert!(same_skill(" rust ", "Rust"));
        assert!(!same_skill("C", "C++"));
    }
}

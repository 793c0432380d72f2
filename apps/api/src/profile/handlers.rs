use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{same_skill, EducationRecord, FieldSource, UserProfile};
use crate::profile::store;
use crate::state::AppState;

const GPA_RANGE: std::ops::RangeInclusive<f64> = 0.0..=4.0;
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1950..=2100;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct EducationInput {
    pub institution: String,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub gpa: Option<f64>,
    pub graduation_year: Option<i32>,
}

/// Manual profile edit. Absent fields are left alone; a present text field
/// set to an empty string clears it.
#[derive(Debug, Default, Deserialize)]
pub struct PatchProfileRequest {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub high_school: Option<String>,
    pub gpa: Option<f64>,
    pub graduation_year: Option<i32>,
    pub intended_major: Option<String>,
    pub skills: Option<Vec<String>>,
    pub education: Option<Vec<EducationInput>>,
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<UserProfile>, AppError> {
    let mut conn = state.db.acquire().await?;
    let profile = store::get_or_create_profile(&mut conn, params.user_id).await?;
    Ok(Json(profile))
}

/// PATCH /api/v1/profile
pub async fn handle_patch_profile(
    State(state): State<AppState>,
    Json(req): Json<PatchProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    validate_patch(&req)?;

    let mut tx = state.db.begin().await?;
    let mut profile = store::lock_profile(&mut tx, req.user_id).await?;
    let touched = apply_patch(&mut profile, req);
    let saved = store::save_profile(&mut tx, &profile).await?;
    tx.commit().await?;

    info!(
        "Profile for user {} edited manually: {:?}",
        saved.user_id, touched
    );
    Ok(Json(saved))
}

pub fn validate_patch(req: &PatchProfileRequest) -> Result<(), AppError> {
    if let Some(gpa) = req.gpa {
        if !GPA_RANGE.contains(&gpa) {
            return Err(AppError::Validation(format!(
                "gpa must be between 0.0 and 4.0, got {gpa}"
            )));
        }
    }
    if let Some(year) = req.graduation_year {
        if !YEAR_RANGE.contains(&year) {
            return Err(AppError::Validation(format!(
                "graduation_year must be between 1950 and 2100, got {year}"
            )));
        }
    }
    if let Some(email) = req.email.as_deref().map(str::trim) {
        if !email.is_empty() && !email.contains('@') {
            return Err(AppError::Validation("email must contain '@'".to_string()));
        }
    }
    for record in req.education.iter().flatten() {
        if record.institution.trim().is_empty() {
            return Err(AppError::Validation(
                "education.institution must not be empty".to_string(),
            ));
        }
        if record.gpa.is_some_and(|g| !GPA_RANGE.contains(&g)) {
            return Err(AppError::Validation(
                "education.gpa must be between 0.0 and 4.0".to_string(),
            ));
        }
        if record.graduation_year.is_some_and(|y| !YEAR_RANGE.contains(&y)) {
            return Err(AppError::Validation(
                "education.graduation_year must be between 1950 and 2100".to_string(),
            ));
        }
    }
    Ok(())
}

/// Applies a validated patch and marks every touched field as user-entered.
/// Returns the names of the touched fields.
pub fn apply_patch(profile: &mut UserProfile, req: PatchProfileRequest) -> Vec<&'static str> {
    let mut touched = Vec::new();

    let text_fields = [
        ("full_name", req.full_name, &mut profile.full_name),
        ("email", req.email, &mut profile.email),
        ("phone", req.phone, &mut profile.phone),
        ("location", req.location, &mut profile.location),
        ("high_school", req.high_school, &mut profile.high_school),
        ("intended_major", req.intended_major, &mut profile.intended_major),
    ];
    for (name, value, slot) in text_fields {
        let Some(value) = value else { continue };
        let value = value.trim();
        if value.is_empty() {
            *slot = None;
            profile.field_sources.remove(name);
        } else {
            *slot = Some(value.to_string());
            profile.field_sources.insert(name.to_string(), FieldSource::User);
        }
        touched.push(name);
    }

    if let Some(gpa) = req.gpa {
        profile.gpa = Some(gpa);
        profile.field_sources.insert("gpa".to_string(), FieldSource::User);
        touched.push("gpa");
    }
    if let Some(year) = req.graduation_year {
        profile.graduation_year = Some(year);
        profile
            .field_sources
            .insert("graduation_year".to_string(), FieldSource::User);
        touched.push("graduation_year");
    }

    if let Some(skills) = req.skills {
        let mut cleaned: Vec<String> = Vec::new();
        for skill in skills {
            let skill = skill.trim();
            if !skill.is_empty() && !cleaned.iter().any(|s| same_skill(s, skill)) {
                cleaned.push(skill.to_string());
            }
        }
        profile.skills = cleaned;
        touched.push("skills");
    }

    if let Some(education) = req.education {
        profile.education = education
            .into_iter()
            .map(|e| EducationRecord {
                institution: e.institution.trim().to_string(),
                degree: e.degree,
                field_of_study: e.field_of_study,
                gpa: e.gpa,
                graduation_year: e.graduation_year,
                source: FieldSource::User,
            })
            .collect();
        touched.push("education");
    }

    touched
}

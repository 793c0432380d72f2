use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::catalog::{InstitutionRow, ScholarshipRow};
use crate::state::AppState;

const CONTROL_VALUES: &[&str] = &["public", "private_nonprofit", "private_for_profit"];

#[derive(Debug, Default, Deserialize)]
pub struct InstitutionQuery {
    pub state: Option<String>,
    pub search: Option<String>,
    pub control: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScholarshipQuery {
    pub search: Option<String>,
    pub min_amount: Option<i32>,
    /// Hide scholarships whose deadline has passed. Rolling (no deadline) stay listed.
    #[serde(default)]
    pub open_only: bool,
}

/// `%term%` for ILIKE, with LIKE wildcards in the term escaped.
/// Blank terms mean no filter.
pub fn like_pattern(term: Option<&str>) -> Option<String> {
    let term = term.map(str::trim).filter(|t| !t.is_empty())?;
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Some(escaped)
}

pub fn normalize_state(state: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(state) = state.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(format!(
            "state must be a two-letter postal code, got '{state}'"
        )));
    }
    Ok(Some(state.to_ascii_uppercase()))
}

pub fn normalize_control(control: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(control) = control.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    let control = control.to_ascii_lowercase();
    if !CONTROL_VALUES.contains(&control.as_str()) {
        return Err(AppError::Validation(format!(
            "control must be one of {}",
            CONTROL_VALUES.join(", ")
        )));
    }
    Ok(Some(control))
}

/// GET /api/v1/institutions/
pub async fn handle_list_institutions(
    State(state): State<AppState>,
    Query(params): Query<InstitutionQuery>,
) -> Result<Json<Vec<InstitutionRow>>, AppError> {
    let us_state = normalize_state(params.state.as_deref())?;
    let control = normalize_control(params.control.as_deref())?;
    let search = like_pattern(params.search.as_deref());

    let rows = sqlx::query_as(
        r#"
        SELECT * FROM institutions
        WHERE ($1::text IS NULL OR state = $1)
          AND ($2::text IS NULL OR name ILIKE $2 OR city ILIKE $2)
          AND ($3::text IS NULL OR control = $3)
        ORDER BY name
        "#,
    )
    .bind(us_state)
    .bind(search)
    .bind(control)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/v1/institutions/:id
pub async fn handle_get_institution(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<InstitutionRow>, AppError> {
    let row: Option<InstitutionRow> = sqlx::query_as("SELECT * FROM institutions WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    row.map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Institution {id} not found")))
}

/// GET /api/v1/scholarships/
pub async fn handle_list_scholarships(
    State(state): State<AppState>,
    Query(params): Query<ScholarshipQuery>,
) -> Result<Json<Vec<ScholarshipRow>>, AppError> {
    if params.min_amount.is_some_and(|a| a < 0) {
        return Err(AppError::Validation(
            "min_amount must not be negative".to_string(),
        ));
    }
    let search = like_pattern(params.search.as_deref());

    let rows = sqlx::query_as(
        r#"
        SELECT * FROM scholarships
        WHERE ($1::text IS NULL OR name ILIKE $1 OR provider ILIKE $1 OR description ILIKE $1)
          AND ($2::int IS NULL OR amount >= $2)
          AND (NOT $3 OR deadline IS NULL OR deadline >= CURRENT_DATE)
        ORDER BY deadline ASC NULLS LAST, name
        "#,
    )
    .bind(search)
    .bind(params.min_amount)
    .bind(params.open_only)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// GET /api/v1/scholarships/:id
pub async fn handle_get_scholarship(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScholarshipRow>, AppError> {
    let row: Option<ScholarshipRow> = sqlx::query_as("SELECT * FROM scholarships WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    row.map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Scholarship {id} not found")))
}

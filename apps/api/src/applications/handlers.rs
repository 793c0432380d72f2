use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use crate::applications::status::{
    initial_submitted_at, parse_status, transition, ApplicationKind, ApplicationStatus,
};
use crate::applications::store::{
    self, ApplicationChanges, NewCollegeApplication, NewScholarshipApplication,
};
use crate::errors::AppError;
use crate::models::application::{CollegeApplicationRow, ScholarshipApplicationRow};
use crate::profile::handlers::UserIdQuery;
use crate::profile::store::user_exists;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListApplicationsQuery {
    pub user_id: Uuid,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCollegeApplicationRequest {
    pub user_id: Uuid,
    pub institution_id: i32,
    pub status: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateScholarshipApplicationRequest {
    pub user_id: Uuid,
    pub scholarship_id: Uuid,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Absent fields are unchanged. An empty `notes` string clears the notes.
#[derive(Debug, Deserialize)]
pub struct UpdateApplicationRequest {
    pub user_id: Uuid,
    pub status: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub notes: Option<String>,
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

fn initial_status(
    raw: Option<&str>,
    kind: ApplicationKind,
) -> Result<ApplicationStatus, AppError> {
    raw.map(|s| parse_status(s, kind))
        .transpose()
        .map(|s| s.unwrap_or(ApplicationStatus::Planning))
}

fn list_filter(raw: Option<&str>, kind: ApplicationKind) -> Result<Option<&'static str>, AppError> {
    raw.map(|s| parse_status(s, kind).map(|s| s.as_str()))
        .transpose()
}

/// Resolves the status and `submitted_at` after an edit.
pub fn plan_update(
    kind: ApplicationKind,
    current: &str,
    submitted_at: Option<DateTime<Utc>>,
    requested: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(ApplicationStatus, Option<DateTime<Utc>>), AppError> {
    let current = parse_status(current, kind)?;
    let Some(requested) = requested else {
        return Ok((current, submitted_at));
    };
    let next = parse_status(requested, kind)?;
    let submitted_at = transition(current, next, submitted_at, now)?;
    Ok((next, submitted_at))
}

async fn require_user(conn: &mut PgConnection, user_id: Uuid) -> Result<(), AppError> {
    if user_exists(conn, user_id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("User {user_id} not found")))
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Application {id} not found"))
}

// ── Colleges ───────────────────────────────────────────────────────────────

/// GET /api/v1/applications/colleges
pub async fn handle_list_college_applications(
    State(state): State<AppState>,
    Query(params): Query<ListApplicationsQuery>,
) -> Result<Json<Vec<CollegeApplicationRow>>, AppError> {
    let status = list_filter(params.status.as_deref(), ApplicationKind::College)?;
    let mut conn = state.db.acquire().await?;
    let rows = store::list_college(&mut conn, params.user_id, status).await?;
    Ok(Json(rows))
}

/// POST /api/v1/applications/colleges
pub async fn handle_create_college_application(
    State(state): State<AppState>,
    Json(req): Json<CreateCollegeApplicationRequest>,
) -> Result<(StatusCode, Json<CollegeApplicationRow>), AppError> {
    let status = initial_status(req.status.as_deref(), ApplicationKind::College)?;
    let notes = clean_notes(req.notes);

    let mut conn = state.db.acquire().await?;
    require_user(&mut conn, req.user_id).await?;
    if !store::institution_exists(&mut conn, req.institution_id).await? {
        return Err(AppError::NotFound(format!(
            "Institution {} not found",
            req.institution_id
        )));
    }

    let row = store::insert_college(
        &mut conn,
        NewCollegeApplication {
            user_id: req.user_id,
            institution_id: req.institution_id,
            status: status.as_str(),
            deadline: req.deadline,
            notes: notes.as_deref(),
            submitted_at: initial_submitted_at(status, Utc::now()),
        },
    )
    .await?;

    info!(
        "User {} started college application {} for institution {} ({})",
        row.user_id, row.id, row.institution_id, row.status
    );
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/applications/colleges/:id
pub async fn handle_get_college_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<CollegeApplicationRow>, AppError> {
    let mut conn = state.db.acquire().await?;
    store::find_college(&mut conn, id, params.user_id, false)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// PATCH /api/v1/applications/colleges/:id
pub async fn handle_update_college_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateApplicationRequest>,
) -> Result<Json<CollegeApplicationRow>, AppError> {
    let mut tx = state.db.begin().await?;
    let current = store::find_college(&mut tx, id, req.user_id, true)
        .await?
        .ok_or_else(|| not_found(id))?;

    let (status, submitted_at) = plan_update(
        ApplicationKind::College,
        &current.status,
        current.submitted_at,
        req.status.as_deref(),
        Utc::now(),
    )?;
    let notes = match req.notes {
        Some(n) => clean_notes(Some(n)),
        None => current.notes.clone(),
    };

    let row = store::update_college(
        &mut tx,
        id,
        ApplicationChanges {
            status: status.as_str(),
            notes: notes.as_deref(),
            submitted_at,
        },
        req.deadline.or(current.deadline),
    )
    .await?;
    tx.commit().await?;

    if current.status != row.status {
        info!(
            "College application {id}: {} -> {}",
            current.status, row.status
        );
    }
    Ok(Json(row))
}

/// DELETE /api/v1/applications/colleges/:id
pub async fn handle_delete_college_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let mut conn = state.db.acquire().await?;
    if !store::delete_college(&mut conn, id, params.user_id).await? {
        return Err(not_found(id));
    }
    info!("Deleted college application {id}");
    Ok(StatusCode::NO_CONTENT)
}

// ── Scholarships ───────────────────────────────────────────────────────────

/// GET /api/v1/applications/scholarships
pub async fn handle_list_scholarship_applications(
    State(state): State<AppState>,
    Query(params): Query<ListApplicationsQuery>,
) -> Result<Json<Vec<ScholarshipApplicationRow>>, AppError> {
    let status = list_filter(params.status.as_deref(), ApplicationKind::Scholarship)?;
    let mut conn = state.db.acquire().await?;
    let rows = store::list_scholarship(&mut conn, params.user_id, status).await?;
    Ok(Json(rows))
}

/// POST /api/v1/applications/scholarships
pub async fn handle_create_scholarship_application(
    State(state): State<AppState>,
    Json(req): Json<CreateScholarshipApplicationRequest>,
) -> Result<(StatusCode, Json<ScholarshipApplicationRow>), AppError> {
    let status = initial_status(req.status.as_deref(), ApplicationKind::Scholarship)?;
    let notes = clean_notes(req.notes);

    let mut conn = state.db.acquire().await?;
    require_user(&mut conn, req.user_id).await?;
    if !store::scholarship_exists(&mut conn, req.scholarship_id).await? {
        return Err(AppError::NotFound(format!(
            "Scholarship {} not found",
            req.scholarship_id
        )));
    }

    let row = store::insert_scholarship(
        &mut conn,
        NewScholarshipApplication {
            user_id: req.user_id,
            scholarship_id: req.scholarship_id,
            status: status.as_str(),
            notes: notes.as_deref(),
            submitted_at: initial_submitted_at(status, Utc::now()),
        },
    )
    .await?;

    info!(
        "User {} started scholarship application {} for scholarship {} ({})",
        row.user_id, row.id, row.scholarship_id, row.status
    );
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/applications/scholarships/:id
pub async fn handle_get_scholarship_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ScholarshipApplicationRow>, AppError> {
    let mut conn = state.db.acquire().await?;
    store::find_scholarship(&mut conn, id, params.user_id, false)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// PATCH /api/v1/applications/scholarships/:id
pub async fn handle_update_scholarship_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateApplicationRequest>,
) -> Result<Json<ScholarshipApplicationRow>, AppError> {
    if req.deadline.is_some() {
        return Err(AppError::Validation(
            "scholarship deadlines come from the catalog and cannot be edited".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;
    let current = store::find_scholarship(&mut tx, id, req.user_id, true)
        .await?
        .ok_or_else(|| not_found(id))?;

    let (status, submitted_at) = plan_update(
        ApplicationKind::Scholarship,
        &current.status,
        current.submitted_at,
        req.status.as_deref(),
        Utc::now(),
    )?;
    let notes = match req.notes {
        Some(n) => clean_notes(Some(n)),
        None => current.notes.clone(),
    };

    let row = store::update_scholarship(
        &mut tx,
        id,
        ApplicationChanges {
            status: status.as_str(),
            notes: notes.as_deref(),
            submitted_at,
        },
    )
    .await?;
    tx.commit().await?;

    if current.status != row.status {
        info!(
            "Scholarship application {id}: {} -> {}",
            current.status, row.status
        );
    }
    Ok(Json(row))
}

/// DELETE /api/v1/applications/scholarships/:id
pub async fn handle_delete_scholarship_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let mut conn = state.db.acquire().await?;
    if !store::delete_scholarship(&mut conn, id, params.user_id).await? {
        return Err(not_found(id));
    }
    info!("Deleted scholarship application {id}");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_defaults_to_planning() {
        assert_eq!(
            initial_status(None, ApplicationKind::College).unwrap(),
            ApplicationStatus::Planning
        );
        assert_eq!(
            initial_status(Some("in_progress"), ApplicationKind::Scholarship).unwrap(),
            ApplicationStatus::InProgress
        );
        assert!(matches!(
            initial_status(Some("awarded"), ApplicationKind::College),
            Err(AppError::UnprocessableEntity(_))
        ));
    }

    #[test]
    fn test_plan_update_without_status_keeps_state() {
        let now = Utc::now();
        let (status, submitted_at) =
            plan_update(ApplicationKind::College, "planning", None, None, now).unwrap();
        assert_eq!(status, ApplicationStatus::Planning);
        assert_eq!(submitted_at, None);
    }

    #[test]
    fn test_plan_update_submission_stamps_time() {
        let now = Utc::now();
        let (status, submitted_at) = plan_update(
            ApplicationKind::Scholarship,
            "in_progress",
            None,
            Some("submitted"),
            now,
        )
        .unwrap();
        assert_eq!(status, ApplicationStatus::Submitted);
        assert_eq!(submitted_at, Some(now));
    }

    #[test]
    fn test_plan_update_rejects_illegal_transition() {
        let err = plan_update(
            ApplicationKind::College,
            "rejected",
            Some(Utc::now()),
            Some("accepted"),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }

    #[test]
    fn test_clean_notes() {
        assert_eq!(clean_notes(Some("  essay due  ".into())), Some("essay due".into()));
        assert_eq!(clean_notes(Some("   ".into())), None);
        assert_eq!(clean_notes(None), None);
    }

    #[test]
    fn test_list_filter_validates_status() {
        assert_eq!(
            list_filter(Some("Submitted"), ApplicationKind::College).unwrap(),
            Some("submitted")
        );
        assert!(list_filter(Some("awarded"), ApplicationKind::College).is_err());
        assert_eq!(list_filter(None, ApplicationKind::College).unwrap(), None);
    }
}

use std::collections::BTreeSet;

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::extract::{extract_document, DocumentKind};
use crate::ingest::infer::InferredProfile;
use crate::ingest::merge::{
    merge_profile, FieldChange, MergeConflict, MergeOptions, MergeOutcome, SkippedField,
};
use crate::ingest::pending::{delete_pending, load_pending, save_pending, PendingUpload};
use crate::ingest::storage::archive_original;
use crate::models::profile::{ResumeUploadRow, UserProfile, SCALAR_FIELDS};
use crate::profile::handlers::UserIdQuery;
use crate::profile::store::{self, NewResumeUpload};
use crate::state::AppState;

const DEFAULT_FILE_NAME: &str = "resume";

#[derive(Debug, Serialize)]
pub struct UploadPreviewResponse {
    pub upload_id: Uuid,
    pub document_kind: DocumentKind,
    pub char_count: usize,
    pub backend: &'static str,
    pub inferred: InferredProfile,
    pub changes: Vec<FieldChange>,
    pub conflicts: Vec<MergeConflict>,
    pub skipped: Vec<SkippedField>,
    pub expires_in_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmUploadRequest {
    pub user_id: Uuid,
    pub upload_id: Uuid,
    /// User-entered fields the user agreed to replace with resume values.
    #[serde(default)]
    pub overwrite: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmUploadResponse {
    pub profile: UserProfile,
    pub changes: Vec<FieldChange>,
    pub conflicts: Vec<MergeConflict>,
    pub skipped: Vec<SkippedField>,
}

struct UploadForm {
    user_id: Uuid,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("invalid multipart body: {}", e.body_text()))
    }
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, AppError> {
    let mut user_id: Option<Uuid> = None;
    let mut file: Option<(Option<String>, Option<String>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("user_id") => {
                let raw = field.text().await.map_err(multipart_error)?;
                let parsed = Uuid::parse_str(raw.trim())
                    .map_err(|_| AppError::Validation(format!("invalid user_id: {raw}")))?;
                user_id = Some(parsed);
            }
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content_type, bytes));
            }
            _ => {}
        }
    }

    let user_id =
        user_id.ok_or_else(|| AppError::Validation("missing 'user_id' field".to_string()))?;
    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;

    Ok(UploadForm {
        user_id,
        file_name,
        content_type,
        bytes,
    })
}

fn overwrite_set(fields: &[String]) -> Result<BTreeSet<String>, AppError> {
    fields
        .iter()
        .map(|f| {
            if SCALAR_FIELDS.contains(&f.as_str()) {
                Ok(f.clone())
            } else {
                Err(AppError::Validation(format!(
                    "cannot overwrite unknown field '{f}'"
                )))
            }
        })
        .collect()
}

/// The pending upload, if it is still live and belongs to `user_id`.
fn claim_pending(
    pending: Option<PendingUpload>,
    user_id: Uuid,
    upload_id: Uuid,
) -> Result<PendingUpload, AppError> {
    let pending = pending
        .ok_or_else(|| AppError::NotFound(format!("Upload {upload_id} not found or expired")))?;
    if pending.user_id != user_id {
        warn!("User {user_id} tried to confirm upload {upload_id} owned by another user");
        return Err(AppError::Forbidden);
    }
    Ok(pending)
}

/// Merges a pending upload into the user's current profile and records the
/// upload. Run inside a transaction: the profile row is locked, and a second
/// apply of the same upload fails on the `resume_uploads` key.
pub async fn apply_pending_upload(
    conn: &mut PgConnection,
    pending: &PendingUpload,
    options: &MergeOptions,
) -> Result<(UserProfile, MergeOutcome), AppError> {
    let inferred_json = serde_json::to_value(&pending.inferred)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to serialize inference: {e}")))?;

    let current = store::lock_profile(conn, pending.user_id).await?;
    let outcome = merge_profile(&current, &pending.inferred, options);
    let profile = store::save_profile(conn, &outcome.profile).await?;
    store::insert_resume_upload(
        conn,
        NewResumeUpload {
            id: pending.upload_id,
            user_id: pending.user_id,
            file_name: &pending.file_name,
            document_kind: pending.document_kind.as_str(),
            s3_key: &pending.s3_key,
            char_count: i32::try_from(pending.char_count).unwrap_or(i32::MAX),
            inferred: inferred_json,
        },
    )
    .await?;
    Ok((profile, outcome))
}

/// POST /api/v1/profile/resume
///
/// Parses the upload and previews the merge. Nothing is written to the
/// profile until the upload is confirmed.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadPreviewResponse>, AppError> {
    let form = read_upload_form(&mut multipart).await?;

    let profile = {
        let mut conn = state.db.acquire().await?;
        store::get_or_create_profile(&mut conn, form.user_id).await?
    };

    let document = extract_document(
        form.bytes.clone(),
        form.file_name.clone(),
        form.content_type,
        state.config.max_upload_bytes,
    )
    .await?;

    let inferred = state.inferencer.infer(&document.text).await?;

    let options = MergeOptions {
        min_confidence: state.config.min_inference_confidence,
        overwrite: BTreeSet::new(),
    };
    let outcome = merge_profile(&profile, &inferred, &options);

    let upload_id = Uuid::new_v4();
    let s3_key = archive_original(
        &state.s3,
        &state.config.s3_bucket,
        form.user_id,
        upload_id,
        document.kind,
        form.bytes,
    )
    .await?;

    let pending = PendingUpload {
        upload_id,
        user_id: form.user_id,
        file_name: form
            .file_name
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
        document_kind: document.kind,
        s3_key,
        char_count: document.char_count,
        inferred: inferred.clone(),
        created_at: Utc::now(),
    };
    save_pending(&state.redis, &pending, state.config.pending_upload_ttl_secs).await?;

    info!(
        "Parsed resume upload {upload_id} for user {} ({}, {} chars, backend={}): {} changes, {} conflicts",
        form.user_id,
        document.kind.as_str(),
        document.char_count,
        state.inferencer.backend(),
        outcome.changes.len(),
        outcome.conflicts.len()
    );

    Ok(Json(UploadPreviewResponse {
        upload_id,
        document_kind: document.kind,
        char_count: document.char_count,
        backend: state.inferencer.backend(),
        inferred,
        changes: outcome.changes,
        conflicts: outcome.conflicts,
        skipped: outcome.skipped,
        expires_in_secs: state.config.pending_upload_ttl_secs,
    }))
}

/// POST /api/v1/profile/resume/confirm
///
/// Re-merges against the current profile, so edits made between preview
/// and confirm are respected.
pub async fn handle_confirm_resume(
    State(state): State<AppState>,
    Json(req): Json<ConfirmUploadRequest>,
) -> Result<Json<ConfirmUploadResponse>, AppError> {
    let overwrite = overwrite_set(&req.overwrite)?;

    let pending = claim_pending(
        load_pending(&state.redis, req.upload_id).await?,
        req.user_id,
        req.upload_id,
    )?;
    let options = MergeOptions {
        min_confidence: state.config.min_inference_confidence,
        overwrite,
    };

    let mut tx = state.db.begin().await?;
    let (profile, outcome) = apply_pending_upload(&mut tx, &pending, &options).await?;
    tx.commit().await?;

    // The profile is already committed; a stale key only expires later.
    if let Err(e) = delete_pending(&state.redis, pending.upload_id).await {
        warn!("Failed to delete pending upload {}: {e}", pending.upload_id);
    }

    info!(
        "Confirmed resume upload {} for user {}: {} changes applied, {} conflicts kept",
        pending.upload_id,
        req.user_id,
        outcome.changes.len(),
        outcome.conflicts.len()
    );

    Ok(Json(ConfirmUploadResponse {
        profile,
        changes: outcome.changes,
        conflicts: outcome.conflicts,
        skipped: outcome.skipped,
    }))
}

/// GET /api/v1/profile/resume/history
pub async fn handle_resume_history(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ResumeUploadRow>>, AppError> {
    let mut conn = state.db.acquire().await?;
    if !store::user_exists(&mut conn, params.user_id).await? {
        return Err(AppError::NotFound(format!(
            "User {} not found",
            params.user_id
        )));
    }
    let uploads = store::list_resume_uploads(&mut conn, params.user_id).await?;
    Ok(Json(uploads))
}

//! Profile persistence. Functions take `&mut PgConnection` so they run the
//! same way on a pooled connection or inside a transaction.

use sqlx::types::Json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{ProfileRow, ResumeUploadRow, UserProfile};

pub async fn user_exists(conn: &mut PgConnection, user_id: Uuid) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    Ok(exists)
}

/// Inserts an empty profile row for an existing user if none exists yet.
async fn ensure_profile(conn: &mut PgConnection, user_id: Uuid) -> Result<(), AppError> {
    if !user_exists(&mut *conn, user_id).await? {
        return Err(AppError::NotFound(format!("User {user_id} not found")));
    }
    sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Loads the user's profile, creating an empty one on first access.
pub async fn get_or_create_profile(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<UserProfile, AppError> {
    ensure_profile(&mut *conn, user_id).await?;
    let row: ProfileRow = sqlx::query_as("SELECT * FROM user_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    Ok(row.into())
}

/// Like `get_or_create_profile` but holds the row lock until the enclosing
/// transaction ends. Concurrent writers for the same user serialize here.
pub async fn lock_profile(conn: &mut PgConnection, user_id: Uuid) -> Result<UserProfile, AppError> {
    ensure_profile(&mut *conn, user_id).await?;
    let row: ProfileRow =
        sqlx::query_as("SELECT * FROM user_profiles WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_one(conn)
            .await?;
    Ok(row.into())
}

pub async fn save_profile(
    conn: &mut PgConnection,
    profile: &UserProfile,
) -> Result<UserProfile, AppError> {
    let row: Option<ProfileRow> = sqlx::query_as(
        r#"
        UPDATE user_profiles SET
            full_name = $2,
            email = $3,
            phone = $4,
            location = $5,
            high_school = $6,
            gpa = $7,
            graduation_year = $8,
            intended_major = $9,
            skills = $10,
            education = $11,
            field_sources = $12,
            updated_at = NOW()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(profile.user_id)
    .bind(&profile.full_name)
    .bind(&profile.email)
    .bind(&profile.phone)
    .bind(&profile.location)
    .bind(&profile.high_school)
    .bind(profile.gpa)
    .bind(profile.graduation_year)
    .bind(&profile.intended_major)
    .bind(&profile.skills)
    .bind(Json(&profile.education))
    .bind(Json(&profile.field_sources))
    .fetch_optional(conn)
    .await?;

    row.map(UserProfile::from)
        .ok_or_else(|| AppError::NotFound(format!("Profile for user {} not found", profile.user_id)))
}

pub struct NewResumeUpload<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: &'a str,
    pub document_kind: &'a str,
    pub s3_key: &'a str,
    pub char_count: i32,
    pub inferred: serde_json::Value,
}

pub async fn insert_resume_upload(
    conn: &mut PgConnection,
    upload: NewResumeUpload<'_>,
) -> Result<ResumeUploadRow, AppError> {
    let row = sqlx::query_as(
        r#"
        INSERT INTO resume_uploads
            (id, user_id, file_name, document_kind, s3_key, char_count, inferred)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(upload.id)
    .bind(upload.user_id)
    .bind(upload.file_name)
    .bind(upload.document_kind)
    .bind(upload.s3_key)
    .bind(upload.char_count)
    .bind(upload.inferred)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn list_resume_uploads(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Vec<ResumeUploadRow>, AppError> {
    let rows = sqlx::query_as(
        "SELECT * FROM resume_uploads WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::models::application::{CollegeApplicationRow, ScholarshipApplicationRow};

pub struct NewCollegeApplication<'a> {
    pub user_id: Uuid,
    pub institution_id: i32,
    pub status: &'a str,
    pub deadline: Option<NaiveDate>,
    pub notes: Option<&'a str>,
    pub submitted_at: Option<DateTime<Utc>>,
}

pub struct NewScholarshipApplication<'a> {
    pub user_id: Uuid,
    pub scholarship_id: Uuid,
    pub status: &'a str,
    pub notes: Option<&'a str>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Full post-edit state of the mutable columns shared by both kinds.
pub struct ApplicationChanges<'a> {
    pub status: &'a str,
    pub notes: Option<&'a str>,
    pub submitted_at: Option<DateTime<Utc>>,
}

fn duplicate_as_conflict(e: sqlx::Error, what: &str) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict(format!("An application for this {what} already exists"))
    } else {
        e.into()
    }
}

pub async fn institution_exists(conn: &mut PgConnection, id: i32) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM institutions WHERE id = $1)")
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(exists)
}

pub async fn scholarship_exists(conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM scholarships WHERE id = $1)")
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(exists)
}

// ── College applications ───────────────────────────────────────────────────

pub async fn insert_college(
    conn: &mut PgConnection,
    new: NewCollegeApplication<'_>,
) -> Result<CollegeApplicationRow, AppError> {
    sqlx::query_as(
        r#"
        INSERT INTO college_applications
            (id, user_id, institution_id, status, deadline, notes, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.institution_id)
    .bind(new.status)
    .bind(new.deadline)
    .bind(new.notes)
    .bind(new.submitted_at)
    .fetch_one(conn)
    .await
    .map_err(|e| duplicate_as_conflict(e, "institution"))
}

pub async fn list_college(
    conn: &mut PgConnection,
    user_id: Uuid,
    status: Option<&str>,
) -> Result<Vec<CollegeApplicationRow>, AppError> {
    let rows = sqlx::query_as(
        r#"
        SELECT * FROM college_applications
        WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
        ORDER BY deadline ASC NULLS LAST, created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(status)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Scoped to the owner. With `for_update`, the row stays locked until the
/// enclosing transaction ends.
pub async fn find_college(
    conn: &mut PgConnection,
    id: Uuid,
    user_id: Uuid,
    for_update: bool,
) -> Result<Option<CollegeApplicationRow>, AppError> {
    let sql = if for_update {
        "SELECT * FROM college_applications WHERE id = $1 AND user_id = $2 FOR UPDATE"
    } else {
        "SELECT * FROM college_applications WHERE id = $1 AND user_id = $2"
    };
    let row = sqlx::query_as(sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn update_college(
    conn: &mut PgConnection,
    id: Uuid,
    changes: ApplicationChanges<'_>,
    deadline: Option<NaiveDate>,
) -> Result<CollegeApplicationRow, AppError> {
    let row = sqlx::query_as(
        r#"
        UPDATE college_applications
        SET status = $2, notes = $3, submitted_at = $4, deadline = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.status)
    .bind(changes.notes)
    .bind(changes.submitted_at)
    .bind(deadline)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn delete_college(
    conn: &mut PgConnection,
    id: Uuid,
    user_id: Uuid,
) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM college_applications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ── Scholarship applications ───────────────────────────────────────────────

pub async fn insert_scholarship(
    conn: &mut PgConnection,
    new: NewScholarshipApplication<'_>,
) -> Result<ScholarshipApplicationRow, AppError> {
    sqlx::query_as(
        r#"
        INSERT INTO scholarship_applications
            (id, user_id, scholarship_id, status, notes, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.scholarship_id)
    .bind(new.status)
    .bind(new.notes)
    .bind(new.submitted_at)
    .fetch_one(conn)
    .await
    .map_err(|e| duplicate_as_conflict(e, "scholarship"))
}

pub async fn list_scholarship(
    conn: &mut PgConnection,
    user_id: Uuid,
    status: Option<&str>,
) -> Result<Vec<ScholarshipApplicationRow>, AppError> {
    let rows = sqlx::query_as(
        r#"
        SELECT a.* FROM scholarship_applications a
        JOIN scholarships s ON s.id = a.scholarship_id
        WHERE a.user_id = $1 AND ($2::text IS NULL OR a.status = $2)
        ORDER BY s.deadline ASC NULLS LAST, a.created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(status)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn find_scholarship(
    conn: &mut PgConnection,
    id: Uuid,
    user_id: Uuid,
    for_update: bool,
) -> Result<Option<ScholarshipApplicationRow>, AppError> {
    let sql = if for_update {
        "SELECT * FROM scholarship_applications WHERE id = $1 AND user_id = $2 FOR UPDATE"
    } else {
        "SELECT * FROM scholarship_applications WHERE id = $1 AND user_id = $2"
    };
    let row = sqlx::query_as(sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn update_scholarship(
    conn: &mut PgConnection,
    id: Uuid,
    changes: ApplicationChanges<'_>,
) -> Result<ScholarshipApplicationRow, AppError> {
    let row = sqlx::query_as(
        r#"
        UPDATE scholarship_applications
        SET status = $2, notes = $3, submitted_at = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(changes.status)
    .bind(changes.notes)
    .bind(changes.submitted_at)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn delete_scholarship(
    conn: &mut PgConnection,
    id: Uuid,
    user_id: Uuid,
) -> Result<bool, AppError> {
    let result =
        sqlx::query("DELETE FROM scholarship_applications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() > 0)
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;

/// Account provisioning only. Credentials are held by the external
/// identity provider, not by this service.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!("invalid email address: {email}")))
    }
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AppError::Validation(format!(
            "username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AppError::Validation(
            "username may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserRow>), AppError> {
    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_string();
    validate_email(&email)?;
    validate_username(&username)?;

    let user: UserRow = sqlx::query_as(
        "INSERT INTO users (id, email, username) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&username)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("A user with this email or username already exists".to_string())
        } else {
            e.into()
        }
    })?;

    info!("Registered user {} ({})", user.id, user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/v1/users/:id
pub async fn handle_get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserRow>, AppError> {
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    user.map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("jane@example.com").is_ok());
        assert!(validate_email("jane.doe+apps@mail.school.edu").is_ok());
        assert!(validate_email("jane").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("jane@localhost").is_err());
        assert!(validate_email("jane@@example.com").is_err());
        assert!(validate_email("ja ne@example.com").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("jane_doe-26").is_ok());
        assert!(validate_username("j.d").is_ok());
        assert!(validate_username("jd").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert!(validate_username("jane doe").is_err());
        assert!(validate_username("jané").is_err());
    }
}

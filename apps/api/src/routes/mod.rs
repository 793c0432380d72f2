pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::applications::handlers as applications;
use crate::catalog::handlers as catalog;
use crate::errors::AppError;
use crate::ingest::handlers as ingest;
use crate::profile::handlers as profile;
use crate::state::AppState;
use crate::users::handlers as users;

/// Multipart framing and form fields on top of the document itself.
const BODY_LIMIT_HEADROOM: usize = 64 * 1024;

async fn not_implemented() -> Result<(), AppError> {
    Err(AppError::NotImplemented)
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + BODY_LIMIT_HEADROOM;

    Router::new()
        .route("/health", get(health::health_handler))
        // Users
        .route("/api/v1/auth/register", post(users::handle_register))
        .route("/api/v1/users/:id", get(users::handle_get_user))
        // OAuth login is handled by the external identity provider
        .route("/api/v1/oauth/google/callback", get(not_implemented))
        // Profile
        .route(
            "/api/v1/profile",
            get(profile::handle_get_profile).patch(profile::handle_patch_profile),
        )
        .route("/api/v1/profile/resume", post(ingest::handle_upload_resume))
        .route(
            "/api/v1/profile/resume/confirm",
            post(ingest::handle_confirm_resume),
        )
        .route(
            "/api/v1/profile/resume/history",
            get(ingest::handle_resume_history),
        )
        // Catalog
        .route("/api/v1/institutions", get(catalog::handle_list_institutions))
        .route("/api/v1/institutions/", get(catalog::handle_list_institutions))
        .route("/api/v1/institutions/:id", get(catalog::handle_get_institution))
        .route("/api/v1/scholarships", get(catalog::handle_list_scholarships))
        .route("/api/v1/scholarships/", get(catalog::handle_list_scholarships))
        .route("/api/v1/scholarships/:id", get(catalog::handle_get_scholarship))
        // Applications
        .route(
            "/api/v1/applications/colleges",
            get(applications::handle_list_college_applications)
                .post(applications::handle_create_college_application),
        )
        .route(
            "/api/v1/applications/colleges/:id",
            get(applications::handle_get_college_application)
                .patch(applications::handle_update_college_application)
                .delete(applications::handle_delete_college_application),
        )
        .route(
            "/api/v1/applications/scholarships",
            get(applications::handle_list_scholarship_applications)
                .post(applications::handle_create_scholarship_application),
        )
        .route(
            "/api/v1/applications/scholarships/:id",
            get(applications::handle_get_scholarship_application)
                .patch(applications::handle_update_scholarship_application)
                .delete(applications::handle_delete_scholarship_application),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

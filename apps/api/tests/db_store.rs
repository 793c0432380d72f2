//! Store tests against a real Postgres. Each test runs inside a transaction
//! that is rolled back on drop. Skipped unless TEST_DATABASE_URL is set.

mod common;

use chrono::Utc;
use uuid::Uuid;

use college_api::applications::store::{self as applications, NewCollegeApplication};
use college_api::errors::AppError;
use college_api::ingest::extract::DocumentKind;
use college_api::ingest::handlers::apply_pending_upload;
use college_api::ingest::infer::RuleBasedInferencer;
use college_api::ingest::merge::{merge_profile, MergeOptions};
use college_api::ingest::pending::PendingUpload;
use college_api::models::profile::FieldSource;
use college_api::profile::store;

async fn insert_user(conn: &mut sqlx::PgConnection) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, username) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("{id}@example.com"))
        .bind(format!("u{}", &id.simple().to_string()[..12]))
        .execute(conn)
        .await
        .unwrap();
    id
}

#[tokio::test]
async fn test_profile_created_on_first_access() {
    let Some(mut tx) = common::test_tx().await else {
        return;
    };
    let user_id = insert_user(&mut tx).await;

    let profile = store::get_or_create_profile(&mut tx, user_id).await.unwrap();
    assert_eq!(profile.user_id, user_id);
    assert!(profile.full_name.is_none());
    assert!(profile.skills.is_empty());

    let missing = store::get_or_create_profile(&mut tx, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_merged_profile_round_trips_provenance() {
    let Some(mut tx) = common::test_tx().await else {
        return;
    };
    let user_id = insert_user(&mut tx).await;

    let current = store::lock_profile(&mut tx, user_id).await.unwrap();
    let inferred = RuleBasedInferencer.infer_fields(common::RESUME_TEXT);
    let outcome = merge_profile(
        &current,
        &inferred,
        &MergeOptions {
            min_confidence: 0.5,
            overwrite: Default::default(),
        },
    );
    let saved = store::save_profile(&mut tx, &outcome.profile).await.unwrap();

    assert_eq!(saved.full_name.as_deref(), Some("Jane Q. Doe"));
    assert_eq!(saved.skills.len(), 5);
    assert_eq!(saved.education.len(), 1);
    assert_eq!(saved.education[0].source, FieldSource::Resume);
    assert_eq!(saved.source_of("gpa"), Some(FieldSource::Resume));

    let reloaded = store::get_or_create_profile(&mut tx, user_id).await.unwrap();
    assert_eq!(reloaded.field_sources, saved.field_sources);
}

fn pending_upload(user_id: Uuid) -> PendingUpload {
    let upload_id = Uuid::new_v4();
    PendingUpload {
        upload_id,
        user_id,
        file_name: "resume.docx".to_string(),
        document_kind: DocumentKind::Docx,
        s3_key: format!("resumes/{user_id}/{upload_id}.docx"),
        char_count: common::RESUME_TEXT.chars().count(),
        inferred: RuleBasedInferencer.infer_fields(common::RESUME_TEXT),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_confirm_merges_current_profile_and_rejects_replay() {
    let Some(mut tx) = common::test_tx().await else {
        return;
    };
    let user_id = insert_user(&mut tx).await;
    let options = MergeOptions {
        min_confidence: 0.5,
        overwrite: Default::default(),
    };

    let first = pending_upload(user_id);
    let (profile, outcome) = apply_pending_upload(&mut tx, &first, &options)
        .await
        .unwrap();
    assert_eq!(profile.full_name.as_deref(), Some("Jane Q. Doe"));
    assert!(outcome.conflicts.is_empty());

    // A hand edit made after the first upload survives the next confirm.
    let mut edited = profile.clone();
    edited.full_name = Some("Jane Doe".to_string());
    edited
        .field_sources
        .insert("full_name".to_string(), FieldSource::User);
    store::save_profile(&mut tx, &edited).await.unwrap();

    let second = pending_upload(user_id);
    let (profile, outcome) = apply_pending_upload(&mut tx, &second, &options)
        .await
        .unwrap();
    assert_eq!(profile.full_name.as_deref(), Some("Jane Doe"));
    assert_eq!(outcome.conflicts.len(), 1);
    assert_eq!(outcome.conflicts[0].field, "full_name");

    let history = store::list_resume_uploads(&mut tx, user_id).await.unwrap();
    assert_eq!(history.len(), 2);

    // A failed statement aborts the transaction, so it is the last one here.
    let replay = apply_pending_upload(&mut tx, &first, &options).await;
    assert!(matches!(replay, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_duplicate_college_application_conflicts() {
    let Some(mut tx) = common::test_tx().await else {
        return;
    };
    let user_id = insert_user(&mut tx).await;
    let institution_id = 999_001;
    sqlx::query("INSERT INTO institutions (id, name, state) VALUES ($1, 'Test College', 'MI')")
        .bind(institution_id)
        .execute(&mut *tx)
        .await
        .unwrap();

    let new = || NewCollegeApplication {
        user_id,
        institution_id,
        status: "planning",
        deadline: None,
        notes: None,
        submitted_at: None,
    };
    let created = applications::insert_college(&mut tx, new()).await.unwrap();
    assert_eq!(created.status, "planning");

    // A failed statement aborts the transaction, so it is the last one here.
    let duplicate = applications::insert_college(&mut tx, new()).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_application_scoped_to_owner() {
    let Some(mut tx) = common::test_tx().await else {
        return;
    };
    let owner = insert_user(&mut tx).await;
    let other = insert_user(&mut tx).await;
    let institution_id = 999_002;
    sqlx::query("INSERT INTO institutions (id, name) VALUES ($1, 'Owner College')")
        .bind(institution_id)
        .execute(&mut *tx)
        .await
        .unwrap();

    let created = applications::insert_college(
        &mut tx,
        NewCollegeApplication {
            user_id: owner,
            institution_id,
            status: "submitted",
            deadline: None,
            notes: Some("early action"),
            submitted_at: Some(Utc::now()),
        },
    )
    .await
    .unwrap();

    let as_other = applications::find_college(&mut tx, created.id, other, false)
        .await
        .unwrap();
    assert!(as_other.is_none());
    assert!(!applications::delete_college(&mut tx, created.id, other)
        .await
        .unwrap());
    assert!(applications::delete_college(&mut tx, created.id, owner)
        .await
        .unwrap());
}

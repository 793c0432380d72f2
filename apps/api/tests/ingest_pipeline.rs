mod common;

use std::collections::BTreeSet;

use bytes::Bytes;
use uuid::Uuid;

use college_api::ingest::extract::{extract_document, DocumentKind, ExtractError};
use college_api::ingest::infer::{FieldInferencer, RuleBasedInferencer};
use college_api::ingest::merge::{merge_profile, MergeOptions};
use college_api::models::profile::{FieldSource, UserProfile};

const MAX_BYTES: usize = 5 * 1024 * 1024;

fn options() -> MergeOptions {
    MergeOptions {
        min_confidence: 0.5,
        overwrite: BTreeSet::new(),
    }
}

#[tokio::test]
async fn test_docx_resume_fills_empty_profile() {
    let docx = common::docx_from_lines(common::RESUME_TEXT);
    let document = extract_document(
        Bytes::from(docx),
        Some("jane_doe_resume.docx".to_string()),
        None,
        MAX_BYTES,
    )
    .await
    .unwrap();
    assert_eq!(document.kind, DocumentKind::Docx);
    assert_eq!(document.text, common::RESUME_TEXT);

    let inferred = RuleBasedInferencer.infer(&document.text).await.unwrap();
    let profile = UserProfile::empty(Uuid::new_v4());
    let outcome = merge_profile(&profile, &inferred, &options());

    let merged = &outcome.profile;
    assert_eq!(merged.full_name.as_deref(), Some("Jane Q. Doe"));
    assert_eq!(merged.email.as_deref(), Some("jane.doe@example.com"));
    assert_eq!(merged.phone.as_deref(), Some("(555) 123-4567"));
    assert_eq!(merged.location.as_deref(), Some("Springfield, IL"));
    assert_eq!(merged.high_school.as_deref(), Some("Lincoln High School"));
    assert_eq!(merged.gpa, Some(3.85));
    assert_eq!(merged.graduation_year, Some(2026));
    assert_eq!(merged.intended_major.as_deref(), Some("Mechanical Engineering"));
    assert_eq!(
        merged.skills,
        vec!["Python", "Java", "SolidWorks", "AutoCAD", "Public Speaking"]
    );
    assert_eq!(merged.education.len(), 1);
    assert!(merged
        .field_sources
        .values()
        .all(|s| *s == FieldSource::Resume));
    assert!(outcome.conflicts.is_empty());
}

#[tokio::test]
async fn test_reupload_preserves_user_edits() {
    let inferred = RuleBasedInferencer.infer(common::RESUME_TEXT).await.unwrap();
    let first = merge_profile(&UserProfile::empty(Uuid::new_v4()), &inferred, &options());

    // The user corrects their name by hand, then uploads the same resume again.
    let mut edited = first.profile.clone();
    edited.full_name = Some("Jane Doe".to_string());
    edited
        .field_sources
        .insert("full_name".to_string(), FieldSource::User);

    let second = merge_profile(&edited, &inferred, &options());
    assert!(second.is_noop());
    assert_eq!(second.profile.full_name.as_deref(), Some("Jane Doe"));
    assert_eq!(second.conflicts.len(), 1);
    assert_eq!(second.conflicts[0].field, "full_name");

    let mut consent = options();
    consent.overwrite.insert("full_name".to_string());
    let third = merge_profile(&edited, &inferred, &consent);
    assert_eq!(third.profile.full_name.as_deref(), Some("Jane Q. Doe"));
    assert!(third.conflicts.is_empty());
}

#[tokio::test]
async fn test_plain_text_upload() {
    let document = extract_document(
        Bytes::from_static(b"\xEF\xBB\xBFJane Doe\r\njane@example.com\r\n"),
        Some("resume.txt".to_string()),
        Some("text/plain".to_string()),
        MAX_BYTES,
    )
    .await
    .unwrap();
    assert_eq!(document.kind, DocumentKind::PlainText);
    assert_eq!(document.text, "Jane Doe\njane@example.com");
}

#[tokio::test]
async fn test_rejected_uploads() {
    let err = extract_document(Bytes::new(), None, None, MAX_BYTES)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::Empty));

    let err = extract_document(Bytes::from(vec![b'a'; 64]), None, None, 16)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::TooLarge { size: 64, limit: 16 }));

    let err = extract_document(
        Bytes::from_static(b"\xD0\xCF\x11\xE0legacy"),
        Some("resume.doc".to_string()),
        None,
        MAX_BYTES,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ExtractError::Unsupported(_)));
}

//! Pending uploads: parsed-but-unconfirmed resumes cached in Redis until the
//! user confirms the merge or the TTL expires.

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::extract::DocumentKind;
use crate::ingest::infer::InferredProfile;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingUpload {
    pub upload_id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub document_kind: DocumentKind,
    pub s3_key: String,
    pub char_count: usize,
    pub inferred: InferredProfile,
    pub created_at: DateTime<Utc>,
}

pub fn pending_key(upload_id: Uuid) -> String {
    format!("resume:pending:{upload_id}")
}

pub async fn save_pending(
    redis: &redis::Client,
    pending: &PendingUpload,
    ttl_secs: u64,
) -> Result<(), AppError> {
    let payload = serde_json::to_string(pending)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to serialize pending upload: {e}")))?;
    let mut conn = redis.get_multiplexed_async_connection().await?;
    conn.set_ex::<_, _, ()>(pending_key(pending.upload_id), payload, ttl_secs)
        .await?;
    Ok(())
}

/// `None` when the upload never existed or has expired.
pub async fn load_pending(
    redis: &redis::Client,
    upload_id: Uuid,
) -> Result<Option<PendingUpload>, AppError> {
    let mut conn = redis.get_multiplexed_async_connection().await?;
    let raw: Option<String> = conn.get(pending_key(upload_id)).await?;
    raw.map(|json| {
        serde_json::from_str(&json).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("corrupt pending upload {upload_id}: {e}"))
        })
    })
    .transpose()
}

pub async fn delete_pending(redis: &redis::Client, upload_id: Uuid) -> Result<(), AppError> {
    let mut conn = redis.get_multiplexed_async_connection().await?;
    conn.del::<_, ()>(pending_key(upload_id)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_key_format() {
        let id = Uuid::nil();
        assert_eq!(
            pending_key(id),
            "resume:pending:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_pending_upload_json_shape() {
        let pending = PendingUpload {
            upload_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            file_name: "resume.docx".into(),
            document_kind: DocumentKind::Docx,
            s3_key: "resumes/u/x.docx".into(),
            char_count: 120,
            inferred: InferredProfile::default(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&pending).unwrap();
        assert_eq!(value["document_kind"], "docx");
        let back: PendingUpload = serde_json::from_value(value).unwrap();
        assert_eq!(back, pending);
    }
}

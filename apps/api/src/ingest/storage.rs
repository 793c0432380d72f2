use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::extract::DocumentKind;

pub fn archive_key(user_id: Uuid, upload_id: Uuid, kind: DocumentKind) -> String {
    format!("resumes/{user_id}/{upload_id}.{}", kind.extension())
}

/// Stores the original uploaded document. Returns its object key.
pub async fn archive_original(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    user_id: Uuid,
    upload_id: Uuid,
    kind: DocumentKind,
    bytes: Bytes,
) -> Result<String, AppError> {
    let key = archive_key(user_id, upload_id, kind);
    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(bytes))
        .content_type(kind.content_type())
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

    info!("Archived resume upload to s3://{bucket}/{key}");
    Ok(key)
}

use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::config::Config;
use crate::ingest::infer::FieldInferencer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Pending resume uploads awaiting confirmation.
    pub redis: RedisClient,
    /// Archive of original uploaded documents.
    pub s3: S3Client,
    pub config: Config,
    /// Pluggable field inferencer. Default: RuleBasedInferencer. Swap via ENABLE_LLM_INFERENCE.
    pub inferencer: Arc<dyn FieldInferencer>,
}

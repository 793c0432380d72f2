use std::str::FromStr;

use anyhow::{Context, Result};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_PENDING_UPLOAD_TTL_SECS: u64 = 3600;
const DEFAULT_MIN_INFERENCE_CONFIDENCE: f64 = 0.5;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: Option<String>,
    /// Use the LLM-backed field inferencer instead of the rule-based one.
    pub enable_llm_inference: bool,
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    pub pending_upload_ttl_secs: u64,
    pub min_inference_confidence: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let min_inference_confidence: f64 =
            parse_env_or("MIN_INFERENCE_CONFIDENCE", DEFAULT_MIN_INFERENCE_CONFIDENCE)?;
        if !(0.0..=1.0).contains(&min_inference_confidence) {
            anyhow::bail!("MIN_INFERENCE_CONFIDENCE must be between 0.0 and 1.0");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            enable_llm_inference: parse_bool(
                std::env::var("ENABLE_LLM_INFERENCE").ok().as_deref(),
            ),
            port: parse_env_or("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            pending_upload_ttl_secs: parse_env_or(
                "PENDING_UPLOAD_TTL_SECS",
                DEFAULT_PENDING_UPLOAD_TTL_SECS,
            )?,
            min_inference_confidence,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

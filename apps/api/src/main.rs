use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use college_api::config::Config;
use college_api::db::{create_pool, run_migrations};
use college_api::ingest::infer::{FieldInferencer, RuleBasedInferencer};
use college_api::ingest::llm_inferencer::LlmInferencer;
use college_api::llm_client::{self, LlmClient};
use college_api::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={level},tower_http={level}",
                env!("CARGO_CRATE_NAME"),
                level = &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting college API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())
        .context("Invalid REDIS_URL")?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let inferencer = build_inferencer(&config)?;
    info!("Field inferencer: {}", inferencer.backend());

    let state = AppState {
        db,
        redis,
        s3,
        config: config.clone(),
        inferencer,
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict origins once the web client's domain is fixed
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// RuleBasedInferencer unless ENABLE_LLM_INFERENCE is set.
fn build_inferencer(config: &Config) -> Result<Arc<dyn FieldInferencer>> {
    if !config.enable_llm_inference {
        return Ok(Arc::new(RuleBasedInferencer));
    }
    let api_key = config
        .anthropic_api_key
        .clone()
        .context("ENABLE_LLM_INFERENCE is set but ANTHROPIC_API_KEY is missing")?;
    let llm = LlmClient::new(api_key)?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    Ok(Arc::new(LlmInferencer::new(llm)))
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "college-api-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets on the path, not as subdomains.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}

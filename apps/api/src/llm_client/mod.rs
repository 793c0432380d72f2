//! LLM client: the single point of entry for Anthropic Messages API calls.
//!
//! Only the optional `LlmInferencer` uses it; the default deployment never
//! makes network calls for resume inference.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;
const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_secs(1);
/// Longer waits are not worth holding an upload request open for.
const MAX_RETRY_WAIT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        AppError::Llm(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl MessagesResponse {
    /// Text of the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

enum Attempt {
    Done(MessagesResponse),
    Retryable {
        error: LlmError,
        retry_after: Option<Duration>,
    },
    Fatal(LlmError),
}

/// Only the delay-seconds form of `Retry-After` is honoured.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Wait before retry number `attempt` (1-based): the server's hint when
/// given, otherwise 1s, 2s, 4s..., never more than `MAX_RETRY_WAIT`.
fn retry_delay(attempt: u32, retry_after: Option<Duration>) -> Duration {
    let backoff = BASE_BACKOFF * 2u32.saturating_pow(attempt.saturating_sub(1));
    retry_after.unwrap_or(backoff).min(MAX_RETRY_WAIT)
}

fn api_error_message(raw: String) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(&raw)
        .map(|e| e.error.message)
        .unwrap_or(raw)
}

/// Wraps the Messages API with retry logic and a JSON helper.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
        })
    }

    /// Sends one user message. 429 and 5xx responses and transport errors
    /// are retried; a `Retry-After` header overrides the backoff.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<MessagesResponse, LlmError> {
        let body = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let mut attempt = 0;
        loop {
            let (error, retry_after) = match self.send(&body).await {
                Attempt::Done(parsed) => return Ok(parsed),
                Attempt::Fatal(e) => return Err(e),
                Attempt::Retryable { error, retry_after } => (error, retry_after),
            };
            attempt += 1;
            if attempt >= MAX_ATTEMPTS {
                warn!("Resume inference via {MODEL} failed after {attempt} attempts: {error}");
                return Err(error);
            }
            let delay = retry_delay(attempt, retry_after);
            warn!(
                "Resume inference attempt {attempt}/{MAX_ATTEMPTS} failed ({error}), retrying in {}ms",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Attempt {
        let response = match self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() || e.is_connect() => {
                return Attempt::Retryable {
                    error: LlmError::Http(e),
                    retry_after: None,
                }
            }
            Err(e) => return Attempt::Fatal(LlmError::Http(e)),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<MessagesResponse>().await {
                Ok(parsed) => {
                    debug!(
                        "LLM call succeeded: input_tokens={}, output_tokens={}",
                        parsed.usage.input_tokens, parsed.usage.output_tokens
                    );
                    Attempt::Done(parsed)
                }
                Err(e) => Attempt::Fatal(LlmError::Http(e)),
            };
        }

        let retry_after = parse_retry_after(response.headers());
        let raw = response.text().await.unwrap_or_default();
        let error = LlmError::Api {
            status: status.as_u16(),
            message: api_error_message(raw),
        };
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Attempt::Retryable { error, retry_after }
        } else {
            Attempt::Fatal(error)
        }
    }

    /// Calls the model and deserializes its text answer as JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(serde_json::from_str(strip_json_fences(text))?)
    }
}

/// Strips ```json ... ``` or ``` ... ``` fences the model sometimes adds.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let inner = inner.trim_start();
    inner.strip_suffix("```").map(str::trim).unwrap_or(inner)
}

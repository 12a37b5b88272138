//! OpenAI Provider - Implementation of CompletionProvider for OpenAI's API.
//!
//! Streams chat completions over Server-Sent Events.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new(api_key)
//!     .with_model("o3-mini")
//!     .with_base_url("https://api.openai.com/v1");
//!
//! let provider = OpenAIProvider::new(config)?;
//! ```
//!
//! # Streaming
//!
//! The response body is split into lines across network reads; every
//! `data: ` line is parsed into a `CompletionChunk`. A chunk carrying a
//! `finish_reason`, or the `[DONE]` marker, ends the stream.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::conversation::Role;
use crate::ports::{
    CompletionChunk, CompletionError, CompletionProvider, CompletionRequest, CompletionStream,
    FinishReason, ProviderInfo,
};

pub const DEFAULT_MODEL: &str = "o3-mini";

/// Configuration for the OpenAI provider.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    api_key: Secret<String>,
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Timeout for establishing the stream.
    pub timeout: Duration,
    /// Maximum retries on transient failures before the first byte.
    pub max_retries: u32,
}

impl OpenAIConfig {
    pub fn new(api_key: Secret<String>) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI API provider implementation.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Result<Self, CompletionError> {
        // No overall timeout: it would cut long streams. Only connecting is bounded.
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| CompletionError::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn to_openai_request(&self, request: &CompletionRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: self.config.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    content: m.content.clone(),
                })
                .collect(),
            max_completion_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        }
    }

    async fn send_streaming_request(
        &self,
        request: &CompletionRequest,
    ) -> Result<Response, CompletionError> {
        let body = self.to_openai_request(request);
        let timeout_secs = self.config.timeout.as_secs() as u32;

        let response = tokio::time::timeout(
            self.config.timeout,
            self.client
                .post(self.completions_url())
                .bearer_auth(self.config.api_key())
                .json(&body)
                .send(),
        )
        .await
        .map_err(|_| CompletionError::Timeout { timeout_secs })?
        .map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout { timeout_secs }
            } else if e.is_connect() {
                CompletionError::network(format!("Connection failed: {}", e))
            } else {
                CompletionError::network(e.to_string())
            }
        })?;

        Self::handle_response_status(response).await
    }

    async fn handle_response_status(response: Response) -> Result<Response, CompletionError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        Err(Self::error_for_status(status.as_u16(), error_body))
    }

    fn error_for_status(status: u16, error_body: String) -> CompletionError {
        match status {
            401 | 403 => CompletionError::AuthenticationFailed,
            429 => CompletionError::rate_limited(Self::parse_retry_after(&error_body)),
            400 if error_body.contains("context_length_exceeded")
                || error_body.contains("maximum context length") =>
            {
                CompletionError::ContextTooLong(error_body)
            }
            400 | 404 | 422 => CompletionError::InvalidRequest(error_body),
            500..=599 => {
                CompletionError::unavailable(format!("Server error {}: {}", status, error_body))
            }
            _ => CompletionError::network(format!("Unexpected status {}: {}", status, error_body)),
        }
    }

    /// Extracts "try again in Ns" from an error body. Defaults to 30 seconds.
    fn parse_retry_after(error_body: &str) -> u32 {
        serde_json::from_str::<serde_json::Value>(error_body)
            .ok()
            .and_then(|parsed| {
                let message = parsed.get("error")?.get("message")?.as_str()?.to_string();
                let rest = &message[message.find("try again in ")? + 13..];
                let end = rest.find(|c: char| !c.is_ascii_digit())?;
                rest[..end].parse::<u32>().ok()
            })
            .unwrap_or(30)
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn generate(&self, request: CompletionRequest) -> Result<CompletionStream, CompletionError> {
        let mut attempt = 0;
        let response = loop {
            match self.send_streaming_request(&request).await {
                Ok(response) => break response,
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    tracing::warn!(
                        conversation_id = %request.metadata.conversation_id,
                        attempt,
                        error = %err,
                        "retrying completion request"
                    );
                    sleep(backoff(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        };

        let stream = response
            .bytes_stream()
            .scan(SseLineBuffer::default(), |buffer, read| {
                let items = match read {
                    Ok(bytes) => buffer.push(&bytes),
                    Err(e) => vec![Err(CompletionError::network(format!("Stream error: {}", e)))],
                };
                futures::future::ready(Some(items))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("openai", &self.config.model)
    }
}

/// Longest wait between retries.
const MAX_BACKOFF_SECS: u64 = 30;

/// Exponential backoff: 1s, 2s, 4s, ... capped at `MAX_BACKOFF_SECS`.
fn backoff(attempt: u32) -> Duration {
    let secs = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_secs(secs.min(MAX_BACKOFF_SECS))
}

/// Reassembles SSE lines that arrive split across network reads.
///
/// Bytes are held until a full line is present, so a multibyte character
/// split between reads decodes intact.
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<Result<CompletionChunk, CompletionError>> {
        self.pending.extend_from_slice(bytes);

        let mut results = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw);
            if let Some(item) = parse_sse_line(line.trim_end_matches(['\r', '\n'])) {
                results.push(item);
            }
        }
        results
    }
}

/// Parses one SSE line. Comments, blank lines and empty deltas yield nothing.
fn parse_sse_line(line: &str) -> Option<Result<CompletionChunk, CompletionError>> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(Ok(CompletionChunk::final_chunk(FinishReason::Stop)));
    }

    let chunk = match serde_json::from_str::<StreamResponseChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            return Some(Err(CompletionError::parse(format!(
                "Failed to parse SSE chunk: {}",
                e
            ))))
        }
    };
    let choice = chunk.choices.into_iter().next()?;
    let delta = choice.delta.content.unwrap_or_default();

    match choice.finish_reason.as_deref() {
        Some("content_filter") => Some(Err(CompletionError::content_filtered(
            "response blocked by content filter",
        ))),
        Some(reason) => Some(Ok(CompletionChunk {
            delta,
            finish_reason: Some(match reason {
                "length" => FinishReason::Length,
                _ => FinishReason::Stop,
            }),
        })),
        None if delta.is_empty() => None,
        None => Some(Ok(CompletionChunk::content(delta))),
    }
}

// ----- OpenAI API Types -----

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamResponseChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

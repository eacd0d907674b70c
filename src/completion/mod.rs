//! Text-completion capability used by every pipeline stage

mod ollama;
mod openai;

#[cfg(test)]
pub(crate) mod testing;

pub use ollama::OllamaCompletion;
pub use openai::OpenAiCompletion;

use crate::config::{BackendKind, CompletionConfig};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// What a stage asks the model for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Fixed role prompt of the calling stage
    pub instruction: String,
    pub input: String,
    pub max_output_tokens: u32,
}

/// Base trait for completion backends
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Complete the request and return the raw model text
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, CompletionError>;

    /// Backend name for logs and health output
    fn name(&self) -> &str;

    /// Whether credentials the backend needs are present
    fn is_configured(&self) -> bool {
        true
    }
}

/// A failed completion call. Every variant is treated as transient by the orchestrator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompletionError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Malformed output: {0}")]
    Malformed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl CompletionError {
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = body.chars().take(200).collect::<String>();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            CompletionError::RateLimited(format!("{}: {}", status, body))
        } else {
            CompletionError::Backend(format!("{}: {}", status, body))
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CompletionError::Malformed(err.to_string())
        } else {
            CompletionError::Network(err.to_string())
        }
    }
}

/// Construct the backend named by the configuration
pub fn build_backend(
    config: &CompletionConfig,
    request_timeout: Duration,
) -> Result<Arc<dyn TextCompletion>> {
    let backend: Arc<dyn TextCompletion> = match config.backend {
        BackendKind::Ollama => Arc::new(OllamaCompletion::new(config, request_timeout)?),
        BackendKind::OpenAi => Arc::new(OpenAiCompletion::new(config, request_timeout)?),
    };

    tracing::info!(
        backend = backend.name(),
        endpoint = %config.endpoint(),
        model = %config.model(),
        "Completion backend ready"
    );

    Ok(backend)
}

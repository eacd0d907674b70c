// Ollama chat backend

use super::{CompletionError, CompletionRequest, TextCompletion};
use crate::config::CompletionConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Non-streaming client for a local or remote Ollama server
pub struct OllamaCompletion {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OllamaCompletion {
    pub fn new(config: &CompletionConfig, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            model: config.model(),
            temperature: config.temperature,
        })
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: request.instruction.clone(),
                },
                Message {
                    role: "user".to_string(),
                    content: request.input.clone(),
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: request.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl TextCompletion for OllamaCompletion {
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, CompletionError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.endpoint))
            .json(&self.build_request(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_status(status, &body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        Ok(chat_response.message.content)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Message,
}

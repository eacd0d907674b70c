// OpenAI-compatible chat completions backend

use super::{CompletionError, CompletionRequest, TextCompletion};
use crate::config::CompletionConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OpenAiCompletion {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl OpenAiCompletion {
    /// The API key is read once, from the variable named by `api_key_env`.
    pub fn new(config: &CompletionConfig, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());

        if api_key.is_none() {
            tracing::warn!("{} is not set; requests will be sent unauthenticated", config.api_key_env);
        }

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            model: config.model(),
            temperature: config.temperature,
            api_key,
        })
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
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
            temperature: self.temperature,
            max_tokens: request.max_output_tokens,
        }
    }
}

#[async_trait]
impl TextCompletion for OpenAiCompletion {
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, CompletionError> {
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(&self.build_request(request));

        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_status(status, &body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::Malformed("response has no message content".to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;

    fn config() -> CompletionConfig {
        CompletionConfig {
            backend: BackendKind::OpenAi,
            model: Some("gpt-test".to_string()),
            api_key_env: "SIGNGLOSS_TEST_UNSET_KEY".to_string(),
            ..CompletionConfig::default()
        }
    }

    #[test]
    fn test_request_shape() {
        let backend = OpenAiCompletion::new(&config(), Duration::from_secs(1)).unwrap();
        let request = CompletionRequest {
            instruction: "role".to_string(),
            input: "gloss".to_string(),
            max_output_tokens: 32,
        };

        let body = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["max_tokens"], 32);
        assert_eq!(body["messages"][0]["content"], "role");
        assert_eq!(backend.endpoint, "https://api.openai.com/v1");
    }

    #[test]
    fn test_response_parsing() {
        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Hello."}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Hello."));
    }
}

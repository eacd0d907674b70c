//! Configuration file support for the gloss pipeline

use crate::error::{GlossError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration, one section per concern.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub service: ServiceConfig,
}

/// Retry and timing knobs handed to the orchestrator at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum attempts per stage, first attempt included
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    #[serde(default = "default_stage_timeout_ms")]
    pub stage_timeout_ms: u64,

    /// Wall-clock budget for the whole stage sequence, backoff included
    #[serde(default = "default_pipeline_timeout_ms")]
    pub pipeline_timeout_ms: u64,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_retry_limit() -> u32 {
    3
}

fn default_stage_timeout_ms() -> u64 {
    30_000
}

fn default_pipeline_timeout_ms() -> u64 {
    90_000
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    8_000
}

fn default_max_output_tokens() -> u32 {
    256
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_limit: default_retry_limit(),
            stage_timeout_ms: default_stage_timeout_ms(),
            pipeline_timeout_ms: default_pipeline_timeout_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }

    pub fn pipeline_timeout(&self) -> Duration {
        Duration::from_millis(self.pipeline_timeout_ms)
    }

    /// Delay before the next attempt after `failed_attempts` consecutive failures.
    ///
    /// Doubles from `backoff_base_ms` and saturates at `backoff_max_ms`.
    pub fn backoff_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1);
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let delay = self
            .backoff_base_ms
            .saturating_mul(factor)
            .min(self.backoff_max_ms);
        Duration::from_millis(delay)
    }

    /// Reject settings the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.retry_limit == 0 {
            return Err(GlossError::Config(
                "pipeline.retry_limit must be at least 1".to_string(),
            ));
        }
        if self.stage_timeout_ms == 0 || self.pipeline_timeout_ms == 0 {
            return Err(GlossError::Config(
                "pipeline timeouts must be greater than zero".to_string(),
            ));
        }
        if self.max_output_tokens == 0 {
            return Err(GlossError::Config(
                "pipeline.max_output_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which text-completion service backs the stages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Ollama,
    #[serde(rename = "openai")]
    #[value(name = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// Base URL; falls back to the backend's usual address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Environment variable holding the API key (OpenAI-compatible backends)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_backend() -> BackendKind {
    BackendKind::Ollama
}

fn default_temperature() -> f32 {
    0.2
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: None,
            model: None,
            temperature: default_temperature(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl CompletionConfig {
    pub fn endpoint(&self) -> String {
        match (&self.endpoint, self.backend) {
            (Some(endpoint), _) => endpoint.trim_end_matches('/').to_string(),
            (None, BackendKind::Ollama) => "http://localhost:11434".to_string(),
            (None, BackendKind::OpenAi) => "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn model(&self) -> String {
        match (&self.model, self.backend) {
            (Some(model), _) => model.clone(),
            (None, BackendKind::Ollama) => "llama3.2".to_string(),
            (None, BackendKind::OpenAi) => "gpt-4o-mini".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/english_words.json")
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
        }
    }
}

/// What the boundary does with an empty token list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmptyInputPolicy {
    Reject,
    Proceed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_empty_input")]
    pub empty_input: EmptyInputPolicy,

    /// Number of tokens shown by the dataset summary
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

fn default_empty_input() -> EmptyInputPolicy {
    EmptyInputPolicy::Reject
}

fn default_sample_size() -> usize {
    20
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            empty_input: default_empty_input(),
            sample_size: default_sample_size(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or from the user config dir when present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Loading config from {}", path.display());
                Self::from_file(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/signgloss/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("signgloss").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.retry_limit, 3);
        assert_eq!(config.completion.backend, BackendKind::Ollama);
        assert_eq!(config.completion.endpoint(), "http://localhost:11434");
        assert_eq!(config.service.empty_input, EmptyInputPolicy::Reject);
        assert!(config.pipeline.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [pipeline]
            retry_limit = 5

            [completion]
            backend = "openai"
            endpoint = "http://proxy.local/v1/"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.retry_limit, 5);
        assert_eq!(config.pipeline.stage_timeout_ms, 30_000);
        assert_eq!(config.completion.backend, BackendKind::OpenAi);
        assert_eq!(config.completion.endpoint(), "http://proxy.local/v1");
        assert_eq!(config.completion.model(), "gpt-4o-mini");
        assert_eq!(config.completion.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let pipeline = PipelineConfig {
            backoff_base_ms: 100,
            backoff_max_ms: 350,
            ..PipelineConfig::default()
        };
        assert_eq!(pipeline.backoff_for(1), Duration::from_millis(100));
        assert_eq!(pipeline.backoff_for(2), Duration::from_millis(200));
        assert_eq!(pipeline.backoff_for(3), Duration::from_millis(350));
        assert_eq!(pipeline.backoff_for(200), Duration::from_millis(350));
    }

    #[test]
    fn test_example_config_parses() {
        let config: AppConfig = toml::from_str(include_str!("../config.example.toml")).unwrap();
        assert!(config.pipeline.validate().is_ok());
        assert_eq!(config.completion.model(), "llama3.2");
        assert_eq!(config.dataset.path, PathBuf::from("data/english_words.json"));
    }

    #[test]
    fn test_zero_retry_limit_rejected() {
        let pipeline = PipelineConfig {
            retry_limit: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(pipeline.validate(), Err(GlossError::Config(_))));
    }
}

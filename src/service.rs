//! Request/response facade in front of the pipeline
//!
//! Owns the boundary policies the core leaves open (empty input) and shapes the dataset,
//! validation and health answers. Transport is left to the caller.

use crate::config::{EmptyInputPolicy, ServiceConfig};
use crate::orchestration::{PipelineOrchestrator, ProcessingResult};
use crate::validation::TokenStatus;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ServiceOutcome {
    /// Turned away by boundary policy before reaching the pipeline
    Rejected { error: String },
    Completed { result: ProcessingResult },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenCheck {
    pub token: String,
    pub valid: bool,
    pub normalized: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationCounts {
    pub total_tokens: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub valid_tokens: Vec<String>,
    pub invalid_tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub validation_results: Vec<TokenCheck>,
    pub summary: ValidationCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub total_words: usize,
    pub sample_words: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub message: String,
    pub backend: String,
    pub asl_dataset_size: usize,
}

pub struct GlossService {
    orchestrator: Arc<PipelineOrchestrator>,
    config: ServiceConfig,
}

impl GlossService {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, config: ServiceConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    pub fn orchestrator(&self) -> &Arc<PipelineOrchestrator> {
        &self.orchestrator
    }

    /// Apply the empty-input policy, then run the pipeline
    pub async fn process_tokens<S: AsRef<str>>(&self, words: &[S]) -> ServiceOutcome {
        if words.is_empty() && self.config.empty_input == EmptyInputPolicy::Reject {
            return ServiceOutcome::Rejected {
                error: "Words list cannot be empty".to_string(),
            };
        }

        ServiceOutcome::Completed {
            result: self.orchestrator.process(words).await,
        }
    }

    /// Per-token validity plus totals; makes no completion calls
    pub fn validate_tokens<S: AsRef<str>>(&self, words: &[S]) -> ValidationSummary {
        let report = self.orchestrator.validate_only(words);

        let validation_results: Vec<TokenCheck> = report
            .tokens
            .iter()
            .map(|t| {
                let valid = t.status == TokenStatus::Valid;
                TokenCheck {
                    token: t.raw.clone(),
                    valid,
                    normalized: valid.then(|| t.token.to_string()),
                }
            })
            .collect();

        let valid_tokens: Vec<String> = report.valid().map(|t| t.token.to_string()).collect();
        let invalid_tokens: Vec<String> = report.unknown().map(|t| t.raw.clone()).collect();

        ValidationSummary {
            summary: ValidationCounts {
                total_tokens: report.len(),
                valid_count: valid_tokens.len(),
                invalid_count: invalid_tokens.len(),
                valid_tokens,
                invalid_tokens,
            },
            validation_results,
        }
    }

    pub fn dataset_info(&self) -> DatasetInfo {
        let store = self.orchestrator.store();
        DatasetInfo {
            total_words: store.len(),
            sample_words: store
                .list_all()
                .iter()
                .take(self.config.sample_size)
                .map(|e| e.token.clone())
                .collect(),
            description: "Available ASL vocabulary tokens".to_string(),
        }
    }

    pub fn health(&self) -> HealthStatus {
        let completion = self.orchestrator.completion();
        let configured = completion.is_configured();

        HealthStatus {
            status: if configured {
                HealthState::Healthy
            } else {
                HealthState::Warning
            },
            message: if configured {
                "Service is running".to_string()
            } else {
                format!("Service running but {} backend is missing credentials", completion.name())
            },
            backend: completion.name().to_string(),
            asl_dataset_size: self.orchestrator.store().len(),
        }
    }
}

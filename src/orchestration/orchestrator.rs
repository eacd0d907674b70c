// Orchestrator - drives validated gloss through the fixed stage sequence

use super::stages::{AgentStage, standard_stages};
use super::types::{
    ErrorKind, FailureStage, ProcessingResult, StageContext, StageId, StageInput, StageOutput,
};
use crate::completion::{CompletionError, TextCompletion};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::validation::{TokenValidator, ValidationReport};
use crate::vocabulary::VocabularyStore;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Instrument;

/// Turns a raw token list into a sentence, or a failure naming the stage and reason.
///
/// Holds no per-request state: `process` takes `&self` and any number of requests may run
/// at once. Stages inside one request always run one after another.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    validator: TokenValidator,
    completion: Arc<dyn TextCompletion>,
    stages: Vec<Arc<dyn AgentStage>>,
    request_ids: AtomicU64,
}

impl PipelineOrchestrator {
    /// Create an orchestrator running the standard three stages
    pub fn new(
        store: Arc<VocabularyStore>,
        completion: Arc<dyn TextCompletion>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            validator: TokenValidator::new(store),
            completion,
            stages: standard_stages(),
            request_ids: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<VocabularyStore> {
        self.validator.store()
    }

    pub fn completion(&self) -> &Arc<dyn TextCompletion> {
        &self.completion
    }

    /// Validation only, no completion calls
    pub fn validate_only<S: AsRef<str>>(&self, raw_tokens: &[S]) -> ValidationReport {
        self.validator.validate(raw_tokens)
    }

    /// Run a request end to end.
    ///
    /// Unknown tokens fail before any completion call. Dropping the returned future cancels
    /// the in-flight completion call.
    pub async fn process<S: AsRef<str>>(&self, raw_tokens: &[S]) -> ProcessingResult {
        let request_id = self.request_ids.fetch_add(1, Ordering::Relaxed);
        let span = tracing::info_span!("gloss_request", request_id, tokens = raw_tokens.len());

        async move {
            let report = self.validator.validate(raw_tokens);
            if !report.is_all_valid() {
                let unknown: Vec<&str> = report.unknown().map(|t| t.raw.as_str()).collect();
                tracing::warn!(unknown = ?unknown, "Rejecting request with unknown tokens");
                return ProcessingResult::failed(
                    FailureStage::Validation,
                    ErrorKind::UnknownToken,
                    format!("unknown tokens: {}", unknown.join(", ")),
                );
            }

            let context = StageContext::new(request_id, report.sequence(), &self.config);
            tracing::info!(gloss = %context.gloss(), "Starting pipeline");

            let budget = self.config.pipeline_timeout();
            match tokio::time::timeout(budget, self.run_stages(&context)).await {
                Ok(Ok(sentence)) => {
                    tracing::info!(sentence = %sentence, "Pipeline complete");
                    ProcessingResult::success(sentence.into_text())
                }
                Ok(Err((stage, err))) => ProcessingResult::failed(
                    FailureStage::Stage(stage),
                    ErrorKind::StageExhausted,
                    format!(
                        "{} failed after {} attempt(s): {}",
                        stage, self.config.retry_limit, err
                    ),
                ),
                Err(_) => {
                    tracing::error!(budget = ?budget, "Pipeline budget exceeded");
                    ProcessingResult::failed(
                        FailureStage::Pipeline,
                        ErrorKind::Timeout,
                        format!("pipeline exceeded {:?}", budget),
                    )
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Like `process`, but gives up as soon as `cancel` resolves.
    ///
    /// No further stage calls are issued after cancellation and the in-flight call is dropped.
    pub async fn process_until<S, F>(&self, raw_tokens: &[S], cancel: F) -> ProcessingResult
    where
        S: AsRef<str>,
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                tracing::info!("Request cancelled by caller");
                ProcessingResult::failed(FailureStage::Pipeline, ErrorKind::Cancelled, "cancelled by caller")
            }
            result = self.process(raw_tokens) => result,
        }
    }

    /// Execute stages sequentially; each stage consumes the previous output
    async fn run_stages(
        &self,
        context: &StageContext,
    ) -> std::result::Result<StageOutput, (StageId, CompletionError)> {
        let mut payload = StageInput::new(context.gloss());

        for stage in &self.stages {
            tracing::debug!(stage = %stage.id(), "{}", stage.id().description());
            let output = self
                .run_with_retry(stage.as_ref(), &payload, context)
                .await
                .map_err(|e| (stage.id(), e))?;

            tracing::debug!(stage = %stage.id(), output = %output, "Stage complete");
            payload = output;
        }

        Ok(payload)
    }

    /// Up to `retry_limit` attempts with exponential backoff in between
    async fn run_with_retry(
        &self,
        stage: &dyn AgentStage,
        input: &StageInput,
        context: &StageContext,
    ) -> std::result::Result<StageOutput, CompletionError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match stage.run(input, context, self.completion.as_ref()).await {
                Ok(output) => return Ok(output),
                Err(err) if attempt < self.config.retry_limit => {
                    let delay = self.config.backoff_for(attempt);
                    tracing::warn!(
                        stage = %stage.id(),
                        attempt,
                        delay = ?delay,
                        error = %err,
                        "Stage attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::error!(stage = %stage.id(), attempt, error = %err, "Stage exhausted");
                    return Err(err);
                }
            }
        }
    }
}

// Core types for the gloss pipeline

use crate::config::PipelineConfig;
use crate::validation::Token;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// WH-question signs; a request containing one is rendered as a question
pub const QUESTION_SIGNS: &[&str] = &["WHAT", "WHO", "WHERE", "WHEN", "WHY", "HOW", "WHICH"];

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StageId {
    Normalizer,          // Canonical gloss ordering
    GrammarBuilder,      // Structured draft sentence
    SentenceSynthesizer, // Fluent final English
}

impl StageId {
    pub const ALL: [StageId; 3] = [
        StageId::Normalizer,
        StageId::GrammarBuilder,
        StageId::SentenceSynthesizer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Normalizer => "Normalizer",
            StageId::GrammarBuilder => "GrammarBuilder",
            StageId::SentenceSynthesizer => "SentenceSynthesizer",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StageId::Normalizer => "Reorders validated gloss into canonical order for translation",
            StageId::GrammarBuilder => "Expands canonical gloss into a structured draft sentence",
            StageId::SentenceSynthesizer => "Polishes the draft into fluent, punctuated English",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text handed from one stage to the next. Each stage returns a fresh payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagePayload(String);

pub type StageInput = StagePayload;
pub type StageOutput = StagePayload;

impl StagePayload {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_text(self) -> String {
        self.0
    }
}

impl fmt::Display for StagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-request, read-only facts every stage may consult
#[derive(Debug, Clone)]
pub struct StageContext {
    pub request_id: u64,
    /// Validated tokens in original gloss order
    pub tokens: Vec<Token>,
    pub max_output_tokens: u32,
    pub stage_timeout: Duration,
}

impl StageContext {
    pub fn new(request_id: u64, tokens: Vec<Token>, config: &PipelineConfig) -> Self {
        Self {
            request_id,
            tokens,
            max_output_tokens: config.max_output_tokens,
            stage_timeout: config.stage_timeout(),
        }
    }

    /// Tokens joined with single spaces
    pub fn gloss(&self) -> String {
        self.tokens
            .iter()
            .map(Token::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_question(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| QUESTION_SIGNS.contains(&t.as_str()))
    }
}

/// Where a request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Validation,
    Stage(StageId),
    Pipeline,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Validation => "validation",
            FailureStage::Stage(stage) => stage.as_str(),
            FailureStage::Pipeline => "pipeline",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FailureStage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Reason code attached to a failure
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownToken,
    StageExhausted,
    Timeout,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::UnknownToken => "UnknownToken",
            ErrorKind::StageExhausted => "StageExhausted",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(text)
    }
}

/// Terminal outcome of one request. Never carries partial output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessingResult {
    Success {
        sentence: String,
    },
    Failure {
        stage: FailureStage,
        reason: ErrorKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl ProcessingResult {
    pub fn success(sentence: impl Into<String>) -> Self {
        ProcessingResult::Success {
            sentence: sentence.into(),
        }
    }

    pub fn failed(stage: FailureStage, reason: ErrorKind, detail: impl Into<String>) -> Self {
        ProcessingResult::Failure {
            stage,
            reason,
            detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingResult::Success { .. })
    }

    pub fn sentence(&self) -> Option<&str> {
        match self {
            ProcessingResult::Success { sentence } => Some(sentence),
            ProcessingResult::Failure { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<(FailureStage, ErrorKind)> {
        match self {
            ProcessingResult::Success { .. } => None,
            ProcessingResult::Failure { stage, reason, .. } => Some((*stage, *reason)),
        }
    }
}

// Stage implementations

mod grammar_builder;
mod normalizer;
mod sentence_synthesizer;

pub use grammar_builder::GrammarBuilderStage;
pub use normalizer::NormalizerStage;
pub use sentence_synthesizer::SentenceSynthesizerStage;

use super::types::{StageContext, StageId, StageInput, StageOutput};
use crate::completion::{CompletionError, CompletionRequest, TextCompletion};
use async_trait::async_trait;
use std::sync::Arc;

/// Base trait for all pipeline stages
#[async_trait]
pub trait AgentStage: Send + Sync {
    fn id(&self) -> StageId;

    /// Fixed role prompt sent with every call
    fn instruction(&self) -> &str;

    /// Render the user message for this stage
    fn format_input(&self, input: &StageInput, context: &StageContext) -> String;

    /// Pull the usable text out of a raw completion
    fn parse_output(&self, raw: &str, context: &StageContext) -> Result<StageOutput, CompletionError>;

    /// One completion call, bounded by the context's stage timeout
    async fn run(
        &self,
        input: &StageInput,
        context: &StageContext,
        completion: &dyn TextCompletion,
    ) -> Result<StageOutput, CompletionError> {
        let request = CompletionRequest {
            instruction: self.instruction().to_string(),
            input: self.format_input(input, context),
            max_output_tokens: context.max_output_tokens,
        };

        let raw = tokio::time::timeout(context.stage_timeout, completion.complete(&request))
            .await
            .map_err(|_| CompletionError::Timeout(context.stage_timeout))??;

        self.parse_output(&raw, context)
    }
}

/// Normalizer, GrammarBuilder, SentenceSynthesizer, in that order
pub fn standard_stages() -> Vec<Arc<dyn AgentStage>> {
    StageId::ALL.iter().map(|id| stage_for(*id)).collect()
}

pub fn stage_for(id: StageId) -> Arc<dyn AgentStage> {
    match id {
        StageId::Normalizer => Arc::new(NormalizerStage::new()),
        StageId::GrammarBuilder => Arc::new(GrammarBuilderStage::new()),
        StageId::SentenceSynthesizer => Arc::new(SentenceSynthesizerStage::new()),
    }
}

const LABELS: &[&str] = &[
    "output",
    "answer",
    "final answer",
    "result",
    "sentence",
    "final sentence",
    "draft",
    "draft sentence",
    "gloss",
    "normalized gloss",
    "english",
    "translation",
];

const COMMENTARY: &[&str] = &["explanation", "note", "notes", "reasoning"];

// Chat openers models put before the answer
const LEAD_INS: &[&str] = &[
    "sure",
    "certainly",
    "of course",
    "okay",
    "here is",
    "here's",
    "here are",
    "below is",
    "the following",
];

/// Reduce a model reply to the single line of usable text.
///
/// Takes the body of the first code fence when present, skips preamble lines ending in ':'
/// and labelled commentary, prefers a line that is not a chat opener ("Sure! Here is..."),
/// drops a leading "Label:" and wrapping quotes, and collapses whitespace. Returns `None` when
/// nothing usable is left.
pub(crate) fn extract_text(raw: &str) -> Option<String> {
    let body = fenced_body(raw).unwrap_or(raw);

    let candidates: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.ends_with(':') && !is_commentary(l))
        .collect();

    // A lone opener-looking line is still the answer
    let line = candidates
        .iter()
        .find(|l| !is_lead_in(l))
        .or_else(|| candidates.first())?;

    let text = strip_quotes(strip_label(line));
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    (!text.is_empty()).then_some(text)
}

fn fenced_body(raw: &str) -> Option<&str> {
    let start = raw.find("```")?;
    let after = &raw[start + 3..];
    // Skip a language tag on the opening fence line
    let after = match after.find('\n') {
        Some(newline)
            if !after[..newline].trim().contains(' ') && !after[..newline].contains("```") =>
        {
            &after[newline + 1..]
        }
        _ => after,
    };
    let end = after.find("```").unwrap_or(after.len());
    Some(&after[..end])
}

fn is_commentary(line: &str) -> bool {
    line.split_once(':').is_some_and(|(label, _)| {
        let label = label.trim().trim_matches('*').trim().to_lowercase();
        COMMENTARY.contains(&label.as_str())
    })
}

fn is_lead_in(line: &str) -> bool {
    let line = line.trim_start_matches('*').trim_start().to_lowercase();
    LEAD_INS.iter().any(|lead| {
        line.strip_prefix(lead)
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric()))
    })
}

fn strip_label(line: &str) -> &str {
    if let Some(colon) = line.find(':') {
        let label = line[..colon].trim().trim_matches('*').trim().to_lowercase();
        if LABELS.contains(&label.as_str()) {
            return line[colon + 1..].trim();
        }
    }
    line
}

fn strip_quotes(text: &str) -> &str {
    let text = text.trim().trim_matches('*').trim();
    let pairs = [('"', '"'), ('\'', '\''), ('“', '”'), ('`', '`')];
    for (open, close) in pairs {
        if text.len() >= 2 && text.starts_with(open) && text.ends_with(close) {
            return text[open.len_utf8()..text.len() - close.len_utf8()].trim();
        }
    }
    text
}

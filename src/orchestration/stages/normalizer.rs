// Normalizer stage - canonical gloss ordering

use super::{AgentStage, extract_text};
use crate::completion::CompletionError;
use crate::orchestration::types::{StageContext, StageId, StageInput, StageOutput};

const INSTRUCTION: &str = r#"You are an ASL gloss normalizer. You receive a sequence of ASL gloss tokens in signing order.

Rewrite the sequence into a canonical gloss ordering that is ready for English translation:
- Keep every sign that carries meaning; do not translate into English yet
- ASL often drops function words; where tense, articles or a copula are implied, insert a bracketed placeholder such as [PAST], [FUTURE], [THE], [A], [IS]
- Topic and WH-question signs may be moved to the position English expects, but keep the question sign itself
- Write every token in UPPERCASE separated by single spaces

Respond with the normalized gloss on a single line and nothing else."#;

/// Cleans validated tokens into canonical gloss order
pub struct NormalizerStage {}

impl NormalizerStage {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for NormalizerStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentStage for NormalizerStage {
    fn id(&self) -> StageId {
        StageId::Normalizer
    }

    fn instruction(&self) -> &str {
        INSTRUCTION
    }

    fn format_input(&self, input: &StageInput, _context: &StageContext) -> String {
        format!("Gloss tokens: {}", input)
    }

    fn parse_output(&self, raw: &str, _context: &StageContext) -> Result<StageOutput, CompletionError> {
        let gloss = extract_text(raw)
            .ok_or_else(|| CompletionError::Malformed("normalizer returned no gloss".to_string()))?;

        let gloss = gloss
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| c == ',' || c == '.'))
            .filter(|t| !t.is_empty())
            .map(str::to_uppercase)
            .collect::<Vec<_>>()
            .join(" ");

        if gloss.is_empty() {
            return Err(CompletionError::Malformed("normalizer returned no gloss".to_string()));
        }

        Ok(StageOutput::new(gloss))
    }
}

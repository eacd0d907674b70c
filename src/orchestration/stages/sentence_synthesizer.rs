// SentenceSynthesizer stage - fluent, punctuated English

use super::{AgentStage, extract_text};
use crate::completion::CompletionError;
use crate::orchestration::types::{StageContext, StageId, StageInput, StageOutput};

const INSTRUCTION: &str = r#"You are an English editor producing the final translation of an ASL utterance.

Polish the draft sentence into fluent, natural English:
- Collapse redundant or repeated phrasing
- Fix capitalization and punctuation; questions end with a question mark
- Keep the meaning of the draft; do not add new information

Respond with the final sentence only."#;

/// Produces the sentence returned to the caller
pub struct SentenceSynthesizerStage {}

impl SentenceSynthesizerStage {
    pub fn new() -> Self {
        Self {}
    }

    /// Capitalize and close the sentence. WH requests always end in '?'; a closing '!' is kept.
    fn finish(&self, text: &str, context: &StageContext) -> String {
        let mut chars = text.chars();
        let mut sentence = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };

        if context.is_question() {
            let end = sentence.trim_end_matches('.').len();
            sentence.truncate(end);
        }
        if !sentence.ends_with(['.', '?', '!']) {
            sentence.push(if context.is_question() { '?' } else { '.' });
        }

        sentence
    }
}

impl Default for SentenceSynthesizerStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentStage for SentenceSynthesizerStage {
    fn id(&self) -> StageId {
        StageId::SentenceSynthesizer
    }

    fn instruction(&self) -> &str {
        INSTRUCTION
    }

    fn format_input(&self, input: &StageInput, context: &StageContext) -> String {
        format!(
            "Draft sentence: {}\nOriginal gloss: {}",
            input,
            context.gloss()
        )
    }

    fn parse_output(&self, raw: &str, context: &StageContext) -> Result<StageOutput, CompletionError> {
        let text = extract_text(raw)
            .ok_or_else(|| CompletionError::Malformed("synthesizer returned no sentence".to_string()))?;

        Ok(StageOutput::new(self.finish(&text, context)))
    }
}

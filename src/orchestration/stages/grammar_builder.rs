// GrammarBuilder stage - structured draft sentence

use super::{AgentStage, extract_text};
use crate::completion::CompletionError;
use crate::orchestration::types::{StageContext, StageId, StageInput, StageOutput};

const INSTRUCTION: &str = r#"You are an English grammar builder working from normalized ASL gloss.

Expand the gloss into one grammatically structured English draft sentence:
- Use subject-verb-object order
- Resolve bracketed placeholders ([PAST], [FUTURE], [THE], [IS], ...) into the matching tense, article or verb
- Turn pronoun signs into the correct English form (YOU NAME -> your name)
- A WH-question sign makes the draft a question

Respond with the draft sentence only, no explanation."#;

pub struct GrammarBuilderStage {}

impl GrammarBuilderStage {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for GrammarBuilderStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentStage for GrammarBuilderStage {
    fn id(&self) -> StageId {
        StageId::GrammarBuilder
    }

    fn instruction(&self) -> &str {
        INSTRUCTION
    }

    fn format_input(&self, input: &StageInput, context: &StageContext) -> String {
        let mut prompt = format!("Normalized gloss: {}\n", input);
        if context.is_question() {
            prompt.push_str("Sentence type: question\n");
        } else {
            prompt.push_str("Sentence type: statement\n");
        }
        prompt
    }

    fn parse_output(&self, raw: &str, _context: &StageContext) -> Result<StageOutput, CompletionError> {
        extract_text(raw)
            .map(StageOutput::new)
            .ok_or_else(|| CompletionError::Malformed("grammar builder returned no draft".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::validation::Token;

    fn context(tokens: &[&str]) -> StageContext {
        let tokens = tokens.iter().map(|t| Token::new(t)).collect();
        StageContext::new(7, tokens, &PipelineConfig::default())
    }

    #[test]
    fn test_format_marks_questions() {
        let stage = GrammarBuilderStage::new();
        let question = stage.format_input(&StageInput::new("WHAT [IS] YOUR NAME"), &context(&["YOU", "NAME", "WHAT"]));
        assert!(question.starts_with("Normalized gloss: WHAT [IS] YOUR NAME"));
        assert!(question.contains("question"));

        let statement = stage.format_input(&StageInput::new("I EAT"), &context(&["I", "EAT"]));
        assert!(statement.contains("statement"));
    }

    #[test]
    fn test_parse_draft() {
        let stage = GrammarBuilderStage::new();
        let output = stage
            .parse_output("Draft: what is your name", &context(&["YOU", "NAME", "WHAT"]))
            .unwrap();
        assert_eq!(output.as_str(), "what is your name");
    }
}

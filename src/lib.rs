// signgloss - ASL gloss tokens to natural English
// Validates gloss against a vocabulary dataset, then runs it through LLM-backed stages

pub mod completion;
pub mod config;
pub mod error;
pub mod orchestration;
pub mod service;
pub mod validation;
pub mod vocabulary;

pub use completion::{CompletionError, CompletionRequest, TextCompletion};
pub use config::AppConfig;
pub use error::{GlossError, Result};
pub use orchestration::{ErrorKind, FailureStage, PipelineOrchestrator, ProcessingResult, StageId};
pub use service::GlossService;
pub use validation::{Token, TokenStatus, TokenValidator, ValidationReport};
pub use vocabulary::{SharedVocabulary, VocabularyEntry, VocabularyStore};

// Orchestration system - validated gloss through a fixed chain of LLM-backed stages

pub mod orchestrator;
pub mod stages;
pub mod types;

pub use orchestrator::PipelineOrchestrator;
pub use stages::AgentStage;
pub use types::*;

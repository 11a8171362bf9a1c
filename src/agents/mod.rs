//! Conversation stages.
//!
//! - [`QueryReformulator`] - follow-up message to standalone question
//! - [`AnswerGenerator`] - grounded answer in the coach persona
//! - [`ConversationOrchestrator`] - runs the stages per invocation and persists the exchange

pub mod generator;
pub mod orchestrator;
pub mod prompts;
pub mod reformulator;

pub use generator::AnswerGenerator;
pub use orchestrator::ConversationOrchestrator;
pub use reformulator::QueryReformulator;

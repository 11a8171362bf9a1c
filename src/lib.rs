//! # OpenSpeak
//!
//! A session-aware, retrieval-augmented speaking coach.
//!
//! ## Overview
//!
//! Each call to [`ConversationOrchestrator::invoke`] runs one turn of a
//! conversation:
//!
//! ```text
//! (session_id, message)
//!     │
//!     ├─ load history ──────── SessionStore snapshot
//!     ├─ reformulate ───────── follow-up → standalone question (skipped on a fresh session)
//!     ├─ retrieve ──────────── top-k chunks from the embedding index
//!     ├─ generate ──────────── persona + stuffed context + recent turns
//!     └─ persist ───────────── (message, answer) appended atomically
//! ```
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use openspeak::{AppState, CoachConfig};
//!
//! let config = CoachConfig::load_or_default("openspeak.toml")?;
//! let state = AppState::from_config(config).await?;
//!
//! let reply = state.orchestrator.invoke("s1", "How do I add emphasis?").await?;
//! println!("{}", reply.answer);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI-compatible APIs such as Groq (default) |
//! | `local-embeddings` | fastembed ONNX embedding models |
//!
//! ## Modules
//!
//! - [`agents`] - Reformulator, generator and orchestrator
//! - [`llm`] - LLM client implementations
//! - [`memory`] - Per-session conversation memory
//! - [`rag`] - Chunking, embeddings, index and retrieval
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration and logging

/// Conversation stages and the orchestrator.
pub mod agents;
/// Command line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Conversation memory.
pub mod memory;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types and errors.
pub mod types;
/// Configuration utilities.
pub mod utils;

pub use agents::{AnswerGenerator, ConversationOrchestrator, QueryReformulator};
pub use llm::{LLMClient, ModelRoute, Provider};
pub use memory::SessionStore;
pub use rag::{retriever::Retriever, KnowledgeBase};
pub use types::{AppError, ChatAnswer, PipelineError, Result, Stage};
pub use utils::toml_config::{CoachConfig, ConfigError};

use std::sync::Arc;
use utils::toml_config::LlmConfig;

/// Everything a host needs to serve conversations.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CoachConfig>,
    pub knowledge: KnowledgeBase,
    pub sessions: Arc<SessionStore>,
    pub orchestrator: ConversationOrchestrator,
}

impl AppState {
    /// Open the index (rebuilding it if the corpus it was last built from
    /// changed), connect the configured models and assemble the pipeline.
    pub async fn from_config(config: CoachConfig) -> Result<Self> {
        let knowledge = KnowledgeBase::open(&config.rag, &config.embedding).await?;
        knowledge.resume().await?;
        let llm = build_model_route(&config.llm)?;
        Ok(Self::assemble(config, knowledge, llm))
    }

    /// Assemble the pipeline around an existing knowledge base and model.
    pub fn assemble(
        config: CoachConfig,
        knowledge: KnowledgeBase,
        llm: Arc<dyn LLMClient>,
    ) -> Self {
        let sessions = Arc::new(match config.memory.max_turns_per_session {
            Some(max) => SessionStore::new().with_max_turns(max),
            None => SessionStore::new(),
        });

        let reformulator = QueryReformulator::new(Arc::clone(&llm))
            .with_instructions(config.persona.reformulate_prompt.clone())
            .with_history_window(config.memory.history_window);
        let retriever = Retriever::new(reformulator, knowledge.index().clone())
            .with_top_k(config.rag.top_k);
        let generator = AnswerGenerator::new(llm)
            .with_persona(config.persona.system_prompt.clone())
            .with_history_window(config.memory.history_window);

        let orchestrator =
            ConversationOrchestrator::new(Arc::clone(&sessions), retriever, generator);

        Self {
            config: Arc::new(config),
            knowledge,
            sessions,
            orchestrator,
        }
    }
}

/// Primary model, wrapped with the fallback model when one is configured.
pub fn build_model_route(config: &LlmConfig) -> Result<Arc<dyn LLMClient>> {
    let primary = config.primary.to_provider()?.create_client()?;
    let mut route = ModelRoute::new(primary);
    if let Some(ref fallback) = config.fallback {
        route = route.with_fallback(fallback.to_provider()?.create_client()?);
    }
    Ok(Arc::new(route))
}

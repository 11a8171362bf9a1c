use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============= Invocation Types =============

/// Successful result of one conversational invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatAnswer {
    pub answer: String,
}

// ============= Conversation Types =============

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One user message or one assistant reply within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

// Timestamps are diagnostic only and never take part in equality.
impl PartialEq for Turn {
    fn eq(&self, other: &Self) -> bool {
        self.role == other.role && self.text == other.text
    }
}

/// Ordered transcript of one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            turns: Vec::new(),
        }
    }
}

// ============= RAG Types =============

/// A bounded segment of reference text with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub text: String,
    /// Character offset of the chunk start in the source document.
    pub source_offset: usize,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl DocumentChunk {
    /// A chunk that has not been embedded yet.
    pub fn unembedded(text: impl Into<String>, source_offset: usize) -> Self {
        Self {
            text: text.into(),
            source_offset,
            embedding: Vec::new(),
        }
    }
}

/// A chunk returned by a similarity search together with its score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

// ============= Pipeline Stages =============

/// Stages of one conversational invocation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    LoadHistory,
    Reformulate,
    Retrieve,
    Generate,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadHistory => "load_history",
            Stage::Reformulate => "reformulate",
            Stage::Retrieve => "retrieve",
            Stage::Generate => "generate",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Reference document missing or unreadable. Callers degrade to an empty index.
    #[error("Source unavailable: {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("Index build failed: {0}")]
    IndexBuild(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    Vector(#[from] openspeak_vector::Error),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Reformulation failed: {0}")]
    Reformulation(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of one conversational invocation.
///
/// Carries the session and the stage that failed; no turns were persisted.
#[derive(Debug, thiserror::Error)]
#[error("session '{session_id}': {stage} stage failed: {source}")]
pub struct PipelineError {
    pub session_id: String,
    pub stage: Stage,
    #[source]
    pub source: AppError,
}

impl PipelineError {
    pub fn new(session_id: impl Into<String>, stage: Stage, source: AppError) -> Self {
        Self {
            session_id: session_id.into(),
            stage,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_equality_ignores_timestamp() {
        let a = Turn::user("hello");
        let mut b = Turn::user("hello");
        b.timestamp = a.timestamp + chrono::Duration::seconds(5);
        assert_eq!(a, b);
        assert_ne!(a, Turn::assistant("hello"));
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::new(
            "s1",
            Stage::Generate,
            AppError::Generation("empty completion".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "session 's1': generate stage failed: Generation failed: empty completion"
        );
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(Role::User.as_str(), "user");
    }
}

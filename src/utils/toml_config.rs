//! TOML-based configuration for OpenSpeak
//!
//! Every field has a default, so an empty or missing `openspeak.toml` yields
//! a working offline setup (hashing embeddings, Groq-hosted chat model).
//!
//! ```toml
//! [rag]
//! corpus_path = "context.txt"
//! chunk_size = 900
//! chunk_overlap = 200
//! top_k = 4
//!
//! [llm.primary]
//! provider = "openai"
//! model = "llama-3.1-8b-instant"
//! base_url = "https://api.groq.com/openai/v1"
//! api_key_env = "GROQ_API_KEY"
//!
//! [llm.fallback]
//! provider = "ollama"
//! model = "llama3.2"
//! ```

use crate::agents::prompts::{
    CONTEXT_PLACEHOLDER, DEFAULT_REFORMULATE_PROMPT, DEFAULT_SYSTEM_PROMPT,
};
use crate::llm::Provider;
use crate::memory::DEFAULT_HISTORY_WINDOW;
use crate::rag::chunker::ChunkStrategy;
use crate::rag::retriever::DEFAULT_TOP_K;
use crate::types::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Root configuration structure loaded from openspeak.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoachConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub persona: PersonaConfig,

    #[serde(default)]
    pub memory: MemoryConfig,
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub chunk_strategy: ChunkStrategy,
}

fn default_collection() -> String {
    "openspeak-chatbot".to_string()
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("context.txt")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/vectors")
}

fn default_chunk_size() -> usize {
    900
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            corpus_path: default_corpus_path(),
            data_dir: default_data_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            chunk_strategy: ChunkStrategy::default(),
        }
    }
}

// ============= Embedding Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Deterministic feature hashing, no model required
    #[default]
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAI,
    /// Local ONNX model (requires the `local-embeddings` feature)
    FastEmbed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    /// Model for the `openai` and `fastembed` providers. The `hashing`
    /// provider ignores it and reports itself as `hashing-{dimensions}`.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_openai_base")]
    pub base_url: String,

    /// Environment variable containing the API key, if the endpoint needs one
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Vector size for the hashing provider
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// LRU entries kept in front of the provider; 0 disables caching
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_cache_capacity() -> usize {
    4096
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: default_embedding_model(),
            base_url: default_openai_base(),
            api_key_env: None,
            dimensions: default_dimensions(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the API key, if one is configured.
    pub fn api_key(&self) -> Result<Option<String>, ConfigError> {
        self.api_key_env
            .as_deref()
            .map(resolve_env)
            .transpose()
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Ollama,
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: LlmProvider,

    /// Model name/identifier to use with the provider
    pub model: String,

    /// Defaults to the provider's usual endpoint
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable containing the API key (OpenAI-compatible only)
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.3
}

impl ModelConfig {
    /// Resolve into a concrete provider, reading the API key from the environment.
    pub fn to_provider(&self) -> Result<Provider, ConfigError> {
        match self.provider {
            LlmProvider::Ollama => Ok(Provider::Ollama {
                base_url: self
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string()),
                model: self.model.clone(),
            }),
            LlmProvider::OpenAI => {
                let env = self.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY");
                Ok(Provider::OpenAI {
                    api_key: resolve_env(env)?,
                    api_base: self.base_url.clone().unwrap_or_else(default_openai_base),
                    model: self.model.clone(),
                    temperature: self.temperature,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_primary_model")]
    pub primary: ModelConfig,

    /// Tried once whenever a primary call fails
    #[serde(default)]
    pub fallback: Option<ModelConfig>,
}

fn default_primary_model() -> ModelConfig {
    ModelConfig {
        provider: LlmProvider::OpenAI,
        model: "llama-3.1-8b-instant".to_string(),
        base_url: Some("https://api.groq.com/openai/v1".to_string()),
        api_key_env: Some("GROQ_API_KEY".to_string()),
        temperature: default_temperature(),
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_model(),
            fallback: None,
        }
    }
}

// ============= Persona & Memory =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Answer instructions; `{context}` is replaced by retrieved text
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_reformulate_prompt")]
    pub reformulate_prompt: String,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_reformulate_prompt() -> String {
    DEFAULT_REFORMULATE_PROMPT.to_string()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            reformulate_prompt: default_reformulate_prompt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Most recent turns sent to the models. A window that would open on an
    /// assistant reply is shortened by one turn.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Stored turns per session; unbounded when unset
    #[serde(default)]
    pub max_turns_per_session: Option<usize>,
}

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            max_turns_per_session: None,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Configuration(e.to_string())
    }
}

fn resolve_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

impl CoachConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(&path) {
            Err(ConfigError::FileNotFound(path)) => {
                info!(path = %path.display(), "No configuration file, using defaults");
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: CoachConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise fail deep inside the pipeline.
    ///
    /// API keys are not checked here; they are resolved when clients are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid =
            |msg: String| -> Result<(), ConfigError> { Err(ConfigError::ValidationError(msg)) };

        let rag = &self.rag;
        if rag.collection.is_empty()
            || rag.collection.contains(|c| c == '/' || c == '\\')
            || rag.collection.starts_with('.')
        {
            return invalid(format!("rag.collection '{}' is not a valid name", rag.collection));
        }
        if rag.chunk_size == 0 {
            return invalid("rag.chunk_size must be greater than zero".to_string());
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return invalid(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                rag.chunk_overlap, rag.chunk_size
            ));
        }
        if rag.top_k == 0 {
            return invalid("rag.top_k must be greater than zero".to_string());
        }

        if self.embedding.provider == EmbeddingProvider::Hashing && self.embedding.dimensions == 0 {
            return invalid("embedding.dimensions must be greater than zero".to_string());
        }

        let models = std::iter::once(("llm.primary", &self.llm.primary))
            .chain(self.llm.fallback.as_ref().map(|m| ("llm.fallback", m)));
        for (section, model) in models {
            if model.model.trim().is_empty() {
                return invalid(format!("{}.model must not be empty", section));
            }
            if !(0.0..=2.0).contains(&model.temperature) {
                return invalid(format!(
                    "{}.temperature must be within [0, 2], got {}",
                    section, model.temperature
                ));
            }
        }

        if !self.persona.system_prompt.contains(CONTEXT_PLACEHOLDER) {
            return invalid(format!(
                "persona.system_prompt must contain the {} placeholder",
                CONTEXT_PLACEHOLDER
            ));
        }
        if self.persona.reformulate_prompt.trim().is_empty() {
            return invalid("persona.reformulate_prompt must not be empty".to_string());
        }

        if self.memory.history_window == 0 {
            return invalid("memory.history_window must be greater than zero".to_string());
        }
        if matches!(self.memory.max_turns_per_session, Some(n) if n < 2) {
            return invalid("memory.max_turns_per_session must be at least 2".to_string());
        }

        Ok(())
    }
}

//! LLM Provider Clients
//!
//! Everything above this module talks to models through [`LLMClient`]:
//! - [`OpenAIClient`](openai::OpenAIClient) - OpenAI and compatible APIs (`openai` feature)
//! - [`OllamaClient`](ollama::OllamaClient) - local Ollama server (`ollama` feature)
//! - [`ModelRoute`] - primary model with an optional single-shot fallback
//!
//! # Example
//!
//! ```ignore
//! use openspeak::llm::{LLMClient, ModelRoute, Provider};
//!
//! let primary = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! }
//! .create_client()?;
//!
//! let route = ModelRoute::new(primary);
//! let reply = route.generate_with_system("Be brief.", "How do I pause?").await?;
//! ```

pub mod client;
pub mod fallback;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{ChatMessage, LLMClient, MessageRole, Provider};
pub use fallback::ModelRoute;

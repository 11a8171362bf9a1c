//! Dense embedding backends.
//!
//! - [`HashingEmbedder`] - deterministic bag-of-words feature hashing; no model
//!   download, no network. Used offline and in tests.
//! - [`OpenAiEmbedder`] - any OpenAI-compatible `/embeddings` endpoint
//!   (OpenAI, Ollama's `/v1`, vLLM, TEI).
//! - [`FastEmbedder`] - local ONNX models via fastembed (`local-embeddings`).

use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Provider-agnostic embedding trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AppError::Embedding("empty embedding response".to_string()))
    }

    /// Model identifier, part of every index fingerprint.
    fn model_name(&self) -> &str;
}

// ============================================================================
// Feature hashing
// ============================================================================

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "before", "by", "can", "do", "does", "for",
    "from", "how", "i", "in", "is", "it", "me", "my", "of", "on", "or", "so", "that", "the",
    "this", "to", "what", "when", "with", "you", "your",
];

/// Deterministic embedder that hashes word unigrams into a fixed-size,
/// L2-normalised vector.
///
/// Texts sharing content words land close under cosine similarity, which is
/// enough for keyword-level retrieval without any model.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(AppError::Configuration(
                "hashing embedder needs at least one dimension".to_string(),
            ));
        }
        Ok(Self {
            dimensions,
            model_name: format!("hashing-{}", dimensions),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .filter(|w| !STOPWORDS.contains(&w.as_str()))
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in Self::tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            // High bit picks the sign to reduce collision bias.
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

// ============================================================================
// OpenAI-compatible HTTP embeddings
// ============================================================================

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
}

impl OpenAiEmbedder {
    /// `api_base` includes the version segment, e.g. `https://api.openai.com/v1`.
    pub fn new(api_base: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: None,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            });
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let mut response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Embedding(format!("Embedding request failed: {}", e)))?
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| AppError::Embedding(format!("Invalid embedding response: {}", e)))?;

        if response.data.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Local ONNX embeddings
// ============================================================================

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::Embedder;
    use crate::types::{AppError, Result};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use parking_lot::Mutex;
    use std::sync::Arc;

    pub struct FastEmbedder {
        model: Arc<Mutex<TextEmbedding>>,
        model_name: String,
    }

    impl FastEmbedder {
        pub fn new(model_name: &str) -> Result<Self> {
            let kind = match model_name.to_lowercase().as_str() {
                "sentence-transformers/all-minilm-l6-v2" | "all-minilm-l6-v2" => {
                    EmbeddingModel::AllMiniLML6V2
                }
                "baai/bge-small-en-v1.5" | "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
                "baai/bge-base-en-v1.5" | "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
                other => {
                    return Err(AppError::Configuration(format!(
                        "Unsupported local embedding model '{}'",
                        other
                    )))
                }
            };

            let model = TextEmbedding::try_new(
                InitOptions::new(kind).with_show_download_progress(true),
            )
            .map_err(|e| AppError::Embedding(e.to_string()))?;

            Ok(Self {
                model: Arc::new(Mutex::new(model)),
                model_name: model_name.to_string(),
            })
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let model = Arc::clone(&self.model);
            let texts = texts.to_vec();
            tokio::task::spawn_blocking(move || model.lock().embed(texts, None))
                .await
                .map_err(|e| AppError::Internal(format!("Embedding task panicked: {}", e)))?
                .map_err(|e| AppError::Embedding(e.to_string()))
        }

        fn model_name(&self) -> &str {
            &self.model_name
        }
    }
}

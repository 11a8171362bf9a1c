//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`rag::chunker`](crate::rag::chunker) - Sliding-window text chunking
//! - [`rag::embeddings`](crate::rag::embeddings) - Embedding backends (hashing, OpenAI-compatible, fastembed)
//! - [`rag::cache`](crate::rag::cache) - LRU cache in front of any embedder
//! - [`rag::index`](crate::rag::index) - Chunk index over a named vector collection
//! - [`rag::retriever`](crate::rag::retriever) - Reformulate-then-search retrieval
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - The corpus is chunked and embedded
//! 2. **Storage** - One immutable collection snapshot per corpus, persisted to disk
//! 3. **Retrieval** - The standalone question is embedded, top-k chunks retrieved
//! 4. **Generation** - The LLM answers with the chunks stuffed into its instructions
//!
//! # Example
//!
//! ```ignore
//! use openspeak::rag::{chunker::TextChunker, embeddings::HashingEmbedder, index::EmbeddingIndex};
//!
//! let chunker = TextChunker::new(900, 200)?;
//! let index = EmbeddingIndex::new(db, Arc::new(HashingEmbedder::new(384)?), "openspeak-chatbot");
//! index.load_or_build(Path::new("context.txt"), &chunker).await?;
//!
//! let chunks = index.search("How do I add emphasis?", 4).await?;
//! ```

pub mod cache;
pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod retriever;

use crate::types::Result;
use crate::utils::toml_config::{EmbeddingConfig, EmbeddingProvider, RagConfig};
use cache::CachedEmbedder;
use chunker::TextChunker;
use embeddings::{Embedder, HashingEmbedder, OpenAiEmbedder};
use index::{EmbeddingIndex, IndexReport};
use openspeak_vector::{Config as VectorConfig, VectorDb};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Build the embedder described by configuration, cached when a capacity is set.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.provider {
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::new(config.dimensions)?),
        EmbeddingProvider::OpenAI => {
            let mut client = OpenAiEmbedder::new(&config.base_url, &config.model);
            if let Some(key) = config.api_key()? {
                client = client.with_api_key(key);
            }
            Arc::new(client)
        }
        #[cfg(feature = "local-embeddings")]
        EmbeddingProvider::FastEmbed => Arc::new(embeddings::FastEmbedder::new(&config.model)?),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProvider::FastEmbed => {
            return Err(crate::types::AppError::Configuration(
                "fastembed provider requires the 'local-embeddings' feature".to_string(),
            ))
        }
    };

    if config.cache_capacity == 0 {
        return Ok(embedder);
    }
    Ok(Arc::new(CachedEmbedder::new(embedder, config.cache_capacity)?))
}

/// The reference corpus together with the index built from it.
#[derive(Clone)]
pub struct KnowledgeBase {
    index: EmbeddingIndex,
    chunker: TextChunker,
    corpus_path: PathBuf,
}

impl KnowledgeBase {
    /// Open the persistent vector store and wire the configured embedder.
    ///
    /// Nothing is embedded until [`refresh`](Self::refresh) or
    /// [`rebuild`](Self::rebuild) runs.
    pub async fn open(rag: &RagConfig, embedding: &EmbeddingConfig) -> Result<Self> {
        let db = VectorDb::open(VectorConfig::persistent(&rag.data_dir)).await?;
        Self::with_store(db, create_embedder(embedding)?, rag)
    }

    /// Use an already opened store and embedder.
    pub fn with_store(db: VectorDb, embedder: Arc<dyn Embedder>, rag: &RagConfig) -> Result<Self> {
        let chunker =
            TextChunker::new(rag.chunk_size, rag.chunk_overlap)?.with_strategy(rag.chunk_strategy);
        Ok(Self {
            index: EmbeddingIndex::new(db, embedder, rag.collection.clone()),
            chunker,
            corpus_path: rag.corpus_path.clone(),
        })
    }

    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    pub fn corpus_path(&self) -> &std::path::Path {
        &self.corpus_path
    }

    /// Reuse the stored index when it matches the corpus, rebuild otherwise.
    pub async fn refresh(&self) -> Result<IndexReport> {
        self.index.load_or_build(&self.corpus_path, &self.chunker).await
    }

    /// Sync against the corpus the stored index was last built from, or the
    /// configured corpus when nothing records one.
    ///
    /// Lets a one-off `index --corpus` run stay in effect for later sessions.
    pub async fn resume(&self) -> Result<IndexReport> {
        let source = match self.index.stored_source() {
            Some(stored) if stored != self.corpus_path => {
                debug!(
                    stored = %stored.display(),
                    configured = %self.corpus_path.display(),
                    "Following corpus recorded by the last index build"
                );
                stored
            }
            _ => self.corpus_path.clone(),
        };
        self.index.load_or_build(&source, &self.chunker).await
    }

    /// Rebuild from the corpus regardless of what is stored.
    pub async fn rebuild(&self) -> Result<IndexReport> {
        self.index.rebuild(&self.corpus_path, &self.chunker).await
    }

    /// Point at a different corpus file.
    pub fn with_corpus(mut self, corpus_path: impl Into<PathBuf>) -> Self {
        self.corpus_path = corpus_path.into();
        self
    }
}

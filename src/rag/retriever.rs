//! History-aware retrieval: reformulate, then search.

use crate::agents::reformulator::QueryReformulator;
use crate::rag::index::EmbeddingIndex;
use crate::types::{DocumentChunk, Result, ScoredChunk, Turn};
use tracing::debug;

/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 4;

/// Output of one retrieval.
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// The question actually searched for.
    pub question: String,
    pub chunks: Vec<ScoredChunk>,
}

impl Retrieval {
    pub fn documents(&self) -> Vec<DocumentChunk> {
        self.chunks.iter().map(|s| s.chunk.clone()).collect()
    }
}

#[derive(Clone)]
pub struct Retriever {
    reformulator: QueryReformulator,
    index: EmbeddingIndex,
    top_k: usize,
}

impl Retriever {
    pub fn new(reformulator: QueryReformulator, index: EmbeddingIndex) -> Self {
        Self {
            reformulator,
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn reformulator(&self) -> &QueryReformulator {
        &self.reformulator
    }

    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    /// Top-k chunks for an already standalone question.
    pub async fn search(&self, question: &str) -> Result<Vec<ScoredChunk>> {
        let chunks = self.index.search_scored(question, self.top_k).await?;
        debug!(
            question,
            hits = chunks.len(),
            best = chunks.first().map(|c| c.score),
            "Retrieved chunks"
        );
        Ok(chunks)
    }

    /// Reformulate `input` against `history`, then search for it.
    pub async fn retrieve(&self, history: &[Turn], input: &str) -> Result<Retrieval> {
        let question = self.reformulator.reformulate(history, input).await?;
        let chunks = self.search(&question).await?;
        Ok(Retrieval { question, chunks })
    }
}

//! Embedding index over a named vector collection.
//!
//! Build time embeds every chunk and installs the result as one immutable
//! collection snapshot; request time embeds the query and runs an exact
//! top-k search against whatever snapshot is current.

use crate::rag::chunker::TextChunker;
use crate::rag::embeddings::Embedder;
use crate::types::{AppError, DocumentChunk, Result, ScoredChunk};
use openspeak_vector::{Collection, SearchResult, StoredVector, VectorDb, VectorMetadata};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const META_TEXT: &str = "text";
const META_OFFSET: &str = "source_offset";

/// Digest identifying what a collection was built from: source text,
/// embedding model and chunking parameters.
pub fn fingerprint(source: &str, model: &str, chunker: &TextChunker) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    hasher.update(model.as_bytes());
    hasher.update(b"|");
    hasher.update((chunker.chunk_size() as u64).to_le_bytes());
    hasher.update((chunker.chunk_overlap() as u64).to_le_bytes());
    hasher.update(format!("{:?}", chunker.strategy()).as_bytes());
    hex::encode(hasher.finalize())
}

/// Outcome of [`EmbeddingIndex::load_or_build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub collection: String,
    /// Corpus file the index was synced against.
    pub source: PathBuf,
    pub chunk_count: usize,
    /// A persisted collection with a matching fingerprint was reused.
    pub reused: bool,
    /// False when the source could not be read. The stored snapshot, if
    /// any, is still served.
    pub source_available: bool,
}

/// Chunks of one collection, searchable by text.
#[derive(Clone)]
pub struct EmbeddingIndex {
    db: VectorDb,
    embedder: Arc<dyn Embedder>,
    collection: String,
}

impl EmbeddingIndex {
    pub fn new(db: VectorDb, embedder: Arc<dyn Embedder>, collection: impl Into<String>) -> Self {
        Self {
            db,
            embedder,
            collection: collection.into(),
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Number of chunks in the current snapshot, 0 before any build.
    pub fn len(&self) -> usize {
        self.db.count(&self.collection).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embed `chunks` and replace the collection with them.
    ///
    /// Returns the number of chunks indexed. Empty input installs an empty
    /// collection.
    pub async fn build(&self, chunks: Vec<DocumentChunk>) -> Result<usize> {
        self.build_from(chunks, None, None).await
    }

    /// Corpus path recorded by the last build from a source file.
    pub fn stored_source(&self) -> Option<PathBuf> {
        self.db
            .collection(&self.collection)
            .ok()
            .and_then(|c| c.source().map(PathBuf::from))
    }

    #[instrument(skip(self, chunks, fingerprint), fields(collection = %self.collection, chunks = chunks.len()))]
    async fn build_from(
        &self,
        chunks: Vec<DocumentChunk>,
        fingerprint: Option<String>,
        source: Option<&Path>,
    ) -> Result<usize> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder
                .embed_batch(&texts)
                .await
                .map_err(|e| AppError::IndexBuild(e.to_string()))?
        };

        if vectors.len() != chunks.len() {
            return Err(AppError::IndexBuild(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let points: Vec<StoredVector> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(ordinal, (chunk, vector))| {
                let mut metadata = VectorMetadata::new();
                metadata.insert(META_TEXT, chunk.text);
                metadata.insert(META_OFFSET, chunk.source_offset);
                StoredVector::new(
                    format!("{}-{:04}", self.collection, ordinal),
                    vector,
                    Some(metadata),
                )
            })
            .collect();

        let count = points.len();
        let mut collection = Collection::build(&self.collection, self.db.metric(), points)
            .map_err(|e| AppError::IndexBuild(e.to_string()))?;
        if let Some(fp) = fingerprint {
            collection = collection.with_fingerprint(fp);
        }
        if let Some(source) = source {
            collection = collection.with_source(source.display().to_string());
        }

        self.db
            .replace_collection(collection)
            .await
            .map_err(|e| AppError::IndexBuild(e.to_string()))?;

        info!(count, "Index built");
        Ok(count)
    }

    /// Top-`k` chunks for `query`, best first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<DocumentChunk>> {
        Ok(self
            .search_scored(query, k)
            .await?
            .into_iter()
            .map(|s| s.chunk)
            .collect())
    }

    /// Like [`search`](Self::search) but keeps similarity scores.
    #[instrument(skip(self, query), fields(collection = %self.collection, k))]
    pub async fn search_scored(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let snapshot = match self.db.collection(&self.collection) {
            Ok(snapshot) => snapshot,
            Err(openspeak_vector::Error::CollectionNotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Retrieval(e.to_string())),
        };
        if snapshot.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| AppError::Retrieval(e.to_string()))?;

        let results = snapshot
            .search(&query_vector, k)
            .map_err(|e| AppError::Retrieval(e.to_string()))?;
        debug!(count = results.len(), "Search completed");

        results.into_iter().map(to_scored_chunk).collect()
    }

    /// Load the collection if it was built from this exact source, model and
    /// chunking; otherwise chunk, embed and persist it.
    ///
    /// An unreadable source keeps whatever snapshot is stored, or installs an
    /// empty index when nothing is, with a warning either way.
    pub async fn load_or_build(&self, source: &Path, chunker: &TextChunker) -> Result<IndexReport> {
        self.sync_from_source(source, chunker, true).await
    }

    /// Chunk, embed and persist `source` unconditionally.
    pub async fn rebuild(&self, source: &Path, chunker: &TextChunker) -> Result<IndexReport> {
        self.sync_from_source(source, chunker, false).await
    }

    #[instrument(skip(self, chunker), fields(collection = %self.collection, source = %source.display()))]
    async fn sync_from_source(
        &self,
        source: &Path,
        chunker: &TextChunker,
        reuse: bool,
    ) -> Result<IndexReport> {
        let report = |chunk_count, reused, source_available| IndexReport {
            collection: self.collection.clone(),
            source: source.to_path_buf(),
            chunk_count,
            reused,
            source_available,
        };

        let text = match tokio::fs::read_to_string(source).await {
            Ok(text) => text,
            Err(e) => {
                let err = AppError::SourceUnavailable {
                    path: source.to_path_buf(),
                    reason: e.to_string(),
                };
                if let Ok(stored) = self.db.collection(&self.collection) {
                    warn!(error = %err, count = stored.len(), "Reference corpus unavailable, keeping stored index");
                    return Ok(report(stored.len(), true, false));
                }
                warn!(error = %err, "Reference corpus unavailable, using empty index");
                self.build(Vec::new()).await?;
                return Ok(report(0, false, false));
            }
        };

        // Stored as an absolute path so later runs from another directory find it.
        let source_path = tokio::fs::canonicalize(source)
            .await
            .unwrap_or_else(|_| source.to_path_buf());
        let expected = fingerprint(&text, self.embedder.model_name(), chunker);

        let existing = reuse
            .then(|| self.db.collection(&self.collection).ok())
            .flatten();
        if let Some(existing) = existing {
            if existing.fingerprint() == Some(expected.as_str()) {
                info!(count = existing.len(), "Reusing persisted index");
                return Ok(report(existing.len(), true, true));
            }
            debug!("Fingerprint changed, rebuilding");
        }

        let chunks = chunker.chunk(&text)?;
        let chunk_count = self
            .build_from(chunks, Some(expected), Some(&source_path))
            .await?;

        Ok(report(chunk_count, false, true))
    }
}

fn to_scored_chunk(result: SearchResult) -> Result<ScoredChunk> {
    let metadata = result
        .metadata
        .as_ref()
        .ok_or_else(|| AppError::Retrieval(format!("chunk '{}' has no metadata", result.id)))?;
    let text = metadata
        .get_string(META_TEXT)
        .ok_or_else(|| AppError::Retrieval(format!("chunk '{}' has no text", result.id)))?
        .to_string();
    let source_offset = metadata.get_int(META_OFFSET).unwrap_or(0).max(0) as usize;

    Ok(ScoredChunk {
        chunk: DocumentChunk {
            text,
            source_offset,
            embedding: result.vector,
        },
        score: result.score,
    })
}

//! # openspeak-vector
//!
//! A small, pure-Rust embedded vector store with named collections, exact
//! nearest-neighbour search and durable on-disk snapshots.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use openspeak_vector::{Collection, Config, DistanceMetric, StoredVector, VectorDb};
//!
//! let db = VectorDb::open(Config::persistent("./data/vectors")).await?;
//!
//! let collection = Collection::build(
//!     "coach",
//!     DistanceMetric::Cosine,
//!     vec![StoredVector::new("coach-0", vec![0.1, 0.9], None)],
//! )?;
//! db.replace_collection(collection).await?;
//!
//! let results = db.search("coach", &[0.1, 0.8], 4).await?;
//! ```
//!
//! ## Concurrency
//!
//! ```text
//! ┌──────────────────────────────── VectorDb ───────────────────────────────┐
//! │  scc::HashMap<name, ArcSwap<Collection>>        writer lock (rebuilds)  │
//! │        │                                                                │
//! │        ├── search: load Arc snapshot, scan it, never blocks a rebuild   │
//! │        └── replace: persist new snapshot, then swap the pointer         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Collections are immutable. A rebuild produces a fresh [`Collection`] and
//! swaps it in atomically; in-flight searches finish on the snapshot they
//! loaded.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod config;
pub mod distance;
pub mod error;
pub mod persistence;
pub mod types;

// Re-exports for convenience
pub use collection::Collection;
pub use config::Config;
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use types::{MetadataValue, SearchResult, StoredVector, VectorId, VectorMetadata};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The main vector database instance.
///
/// `VectorDb` is cheap to clone; clones share the same collections.
#[derive(Clone)]
pub struct VectorDb {
    inner: Arc<VectorDbInner>,
}

struct VectorDbInner {
    config: Config,
    /// One swappable slot per collection name
    collections: scc::HashMap<String, Arc<ArcSwap<Collection>>>,
    /// Serializes rebuilds and deletions so on-disk snapshots never interleave
    writer: tokio::sync::Mutex<()>,
}

impl VectorDb {
    /// Open or create a vector database with the given configuration.
    ///
    /// Persistent databases load every collection found under the data path.
    /// A collection that fails to load is skipped with a warning.
    #[instrument(skip(config), fields(persistent = config.data_path.is_some()))]
    pub async fn open(config: Config) -> Result<Self> {
        info!("Opening vector database");

        let db = Self {
            inner: Arc::new(VectorDbInner {
                config: config.clone(),
                collections: scc::HashMap::new(),
                writer: tokio::sync::Mutex::new(()),
            }),
        };

        if let Some(ref path) = config.data_path {
            db.load_collections(path).await?;
        }

        Ok(db)
    }

    /// Whether this database writes collections to disk.
    pub fn is_persistent(&self) -> bool {
        self.inner.config.data_path.is_some()
    }

    /// Metric used for collections built through this database.
    pub fn metric(&self) -> DistanceMetric {
        self.inner.config.metric
    }

    /// Check if a collection exists.
    pub fn collection_exists(&self, name: &str) -> bool {
        self.inner.collections.contains(name)
    }

    /// List all collection names, sorted.
    pub fn list_collections(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.inner.collections.scan(|k, _| {
            names.push(k.clone());
        });
        names.sort();
        names
    }

    /// Get the current snapshot of a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection doesn't exist.
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        self.slot(name)
            .map(|slot| slot.load_full())
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// Install a collection, replacing any previous snapshot with the same name.
    ///
    /// For persistent databases the snapshot is written to disk before it
    /// becomes visible, so a failed write leaves the previous snapshot both
    /// on disk and in memory.
    #[instrument(skip(self, collection), fields(name = collection.name(), count = collection.len()))]
    pub async fn replace_collection(&self, collection: Collection) -> Result<Arc<Collection>> {
        let _guard = self.inner.writer.lock().await;

        if let Some(ref path) = self.inner.config.data_path {
            persistence::save_collection(path, &collection).await?;
        }

        let name = collection.name().to_string();
        let snapshot = Arc::new(collection);

        match self.slot(&name) {
            Some(slot) => slot.store(Arc::clone(&snapshot)),
            None => {
                let slot = Arc::new(ArcSwap::new(Arc::clone(&snapshot)));
                // Only writers insert and we hold the writer lock.
                let _ = self.inner.collections.insert(name.clone(), slot);
            }
        }

        info!(name, "Collection replaced");
        Ok(snapshot)
    }

    /// Delete a collection and all its data.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        let _guard = self.inner.writer.lock().await;

        if self.inner.collections.remove(name).is_none() {
            return Err(Error::CollectionNotFound(name.to_string()));
        }

        if let Some(ref path) = self.inner.config.data_path {
            persistence::delete_collection(path, name).await?;
        }

        info!(name, "Deleted collection");
        Ok(())
    }

    /// Search for similar vectors, best first.
    #[instrument(skip(self, query), fields(collection, limit, dim = query.len()))]
    pub async fn search(
        &self,
        collection: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let snapshot = self.collection(collection)?;
        let results = snapshot.search(query, limit)?;
        debug!(count = results.len(), "Search completed");
        Ok(results)
    }

    /// Get the number of vectors in a collection.
    pub fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.collection(collection)?.len())
    }

    /// Get collection statistics.
    pub fn collection_stats(&self, collection: &str) -> Result<CollectionStats> {
        Ok(self.collection(collection)?.stats())
    }

    fn slot(&self, name: &str) -> Option<Arc<ArcSwap<Collection>>> {
        self.inner.collections.read(name, |_, v| Arc::clone(v))
    }

    async fn load_collections(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            tokio::fs::create_dir_all(path).await?;
            return Ok(());
        }

        for name in persistence::list_collections(path).await? {
            match persistence::load_collection(path, &name).await {
                Ok(collection) => {
                    let slot = Arc::new(ArcSwap::from_pointee(collection));
                    let _ = self.inner.collections.insert(name.clone(), slot);
                    info!(name, "Loaded collection");
                }
                Err(e) => {
                    warn!(name, error = %e, "Failed to load collection, skipping");
                }
            }
        }

        Ok(())
    }
}

/// Statistics about a collection.
#[derive(Debug, Clone)]
pub struct CollectionStats {
    /// Name of the collection.
    pub name: String,
    /// Number of vectors in the collection.
    pub vector_count: usize,
    /// Dimensionality of vectors (0 when empty).
    pub dimensions: usize,
    /// Distance metric used.
    pub metric: DistanceMetric,
    /// Build fingerprint, if any.
    pub fingerprint: Option<String>,
    /// When the snapshot was built.
    pub built_at: DateTime<Utc>,
}

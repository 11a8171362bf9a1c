//! Persistence layer for openspeak-vector.
//!
//! Each collection lives in its own directory:
//! - `{base_path}/{name}/manifest.json` - collection metadata
//! - `{base_path}/{name}/vectors.json` - vectors and their metadata
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! reader never observes a half-written snapshot.

use crate::collection::Collection;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::StoredVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MANIFEST_FILE: &str = "manifest.json";
const VECTORS_FILE: &str = "vectors.json";

/// Collection metadata stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionManifest {
    name: String,
    dimensions: usize,
    metric: DistanceMetric,
    count: usize,
    #[serde(default)]
    fingerprint: Option<String>,
    #[serde(default)]
    source: Option<String>,
    built_at: DateTime<Utc>,
}

fn collection_dir(base_path: &Path, name: &str) -> PathBuf {
    base_path.join(name)
}

/// Check whether a collection has been persisted under `base_path`.
pub fn collection_exists(base_path: &Path, name: &str) -> bool {
    collection_dir(base_path, name).join(MANIFEST_FILE).exists()
}

/// Save a collection to disk, replacing any previous snapshot of that name.
pub async fn save_collection(base_path: &Path, collection: &Collection) -> Result<()> {
    let dir = collection_dir(base_path, collection.name());
    tokio::fs::create_dir_all(&dir).await?;

    let manifest = CollectionManifest {
        name: collection.name().to_string(),
        dimensions: collection.dimensions(),
        metric: collection.metric(),
        count: collection.len(),
        fingerprint: collection.fingerprint().map(str::to_string),
        source: collection.source().map(str::to_string),
        built_at: collection.built_at(),
    };

    let vectors_json = serde_json::to_vec(collection.points())
        .map_err(|e| Error::Persistence(format!("Failed to serialize vectors: {}", e)))?;
    let manifest_json = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| Error::Persistence(format!("Failed to serialize manifest: {}", e)))?;

    // Vectors first: the manifest is the commit point for a snapshot.
    write_atomic(&dir.join(VECTORS_FILE), &vectors_json).await?;
    write_atomic(&dir.join(MANIFEST_FILE), &manifest_json).await?;

    info!(
        name = collection.name(),
        count = collection.len(),
        path = ?dir,
        "Saved collection"
    );
    Ok(())
}

/// Load a collection from disk.
pub async fn load_collection(base_path: &Path, name: &str) -> Result<Collection> {
    let dir = collection_dir(base_path, name);
    let manifest_path = dir.join(MANIFEST_FILE);

    if !manifest_path.exists() {
        return Err(Error::CollectionNotFound(name.to_string()));
    }

    let manifest_json = tokio::fs::read(&manifest_path).await?;
    let manifest: CollectionManifest = serde_json::from_slice(&manifest_json)
        .map_err(|e| Error::Persistence(format!("Failed to parse manifest: {}", e)))?;

    let vectors_json = tokio::fs::read(dir.join(VECTORS_FILE)).await?;
    let points: Vec<StoredVector> = serde_json::from_slice(&vectors_json)
        .map_err(|e| Error::Persistence(format!("Failed to parse vectors: {}", e)))?;

    if points.len() != manifest.count {
        return Err(Error::Persistence(format!(
            "Collection '{}' manifest lists {} vectors but {} were found",
            name,
            manifest.count,
            points.len()
        )));
    }

    let mut collection = Collection::build(manifest.name, manifest.metric, points)?
        .with_built_at(manifest.built_at);
    if let Some(fingerprint) = manifest.fingerprint {
        collection = collection.with_fingerprint(fingerprint);
    }
    if let Some(source) = manifest.source {
        collection = collection.with_source(source);
    }

    if !collection.is_empty() && collection.dimensions() != manifest.dimensions {
        return Err(Error::DimensionMismatch {
            expected: manifest.dimensions,
            actual: collection.dimensions(),
        });
    }

    debug!(name, count = collection.len(), "Loaded collection");
    Ok(collection)
}

/// Remove a persisted collection. Missing collections are ignored.
pub async fn delete_collection(base_path: &Path, name: &str) -> Result<()> {
    let dir = collection_dir(base_path, name);
    if dir.exists() {
        tokio::fs::remove_dir_all(&dir).await?;
    }
    Ok(())
}

/// List the names of every collection persisted under `base_path`.
pub async fn list_collections(base_path: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    if !base_path.exists() {
        return Ok(names);
    }

    let mut entries = tokio::fs::read_dir(base_path).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if collection_exists(base_path, name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VectorMetadata;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_load_collection() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        let collection = Collection::build(
            "coach",
            DistanceMetric::Cosine,
            vec![
                StoredVector::new(
                    "coach-0",
                    vec![1.0, 0.0, 0.0],
                    Some(VectorMetadata::from_pairs([("text", "Breathe.")])),
                ),
                StoredVector::new("coach-1", vec![0.0, 1.0, 0.0], None),
            ],
        )
        .unwrap()
        .with_fingerprint("abc123")
        .with_source("notes/context.txt");

        save_collection(base, &collection).await.unwrap();
        assert!(collection_exists(base, "coach"));

        let loaded = load_collection(base, "coach").await.unwrap();
        assert_eq!(loaded.name(), "coach");
        assert_eq!(loaded.dimensions(), 3);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.fingerprint(), Some("abc123"));
        assert_eq!(loaded.source(), Some("notes/context.txt"));
        assert_eq!(loaded.points(), collection.points());
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        let first = Collection::build(
            "coach",
            DistanceMetric::Cosine,
            vec![StoredVector::new("old", vec![1.0, 0.0], None)],
        )
        .unwrap();
        save_collection(base, &first).await.unwrap();

        let second = Collection::empty("coach", DistanceMetric::Cosine);
        save_collection(base, &second).await.unwrap();

        let loaded = load_collection(base, "coach").await.unwrap();
        assert!(loaded.is_empty());
        assert!(!base.join("coach").join("vectors.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_missing_collection() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_collection(temp_dir.path(), "nope").await;
        assert!(matches!(result, Err(Error::CollectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();

        for name in ["b", "a"] {
            save_collection(base, &Collection::empty(name, DistanceMetric::Cosine))
                .await
                .unwrap();
        }
        assert_eq!(list_collections(base).await.unwrap(), vec!["a", "b"]);

        delete_collection(base, "a").await.unwrap();
        assert_eq!(list_collections(base).await.unwrap(), vec!["b"]);
    }
}

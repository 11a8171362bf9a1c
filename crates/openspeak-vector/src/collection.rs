//! Vector collection.
//!
//! A collection is an immutable, named snapshot of vectors sharing one
//! dimensionality and distance metric. Rebuilding a collection produces a new
//! snapshot; readers holding the old one are unaffected.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::{SearchResult, StoredVector};
use crate::CollectionStats;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// An immutable collection of vectors with exact nearest-neighbour search.
///
/// Search is brute force over every stored vector, so results are exact and
/// deterministic: ties are broken by insertion order.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    /// Vector dimensions, 0 while the collection holds no vectors.
    dimensions: usize,
    metric: DistanceMetric,
    /// Opaque digest of whatever the caller built this collection from.
    fingerprint: Option<String>,
    /// Where the build input came from, e.g. a corpus path.
    source: Option<String>,
    built_at: DateTime<Utc>,
    points: Vec<StoredVector>,
}

impl Collection {
    /// Create an empty collection.
    pub fn empty(name: impl Into<String>, metric: DistanceMetric) -> Self {
        Self {
            name: name.into(),
            dimensions: 0,
            metric,
            fingerprint: None,
            source: None,
            built_at: Utc::now(),
            points: Vec::new(),
        }
    }

    /// Build a collection from a batch of vectors.
    ///
    /// # Errors
    ///
    /// Fails if vectors disagree on dimensionality, contain non-finite
    /// components or are empty, or if two vectors share an id.
    pub fn build(
        name: impl Into<String>,
        metric: DistanceMetric,
        points: Vec<StoredVector>,
    ) -> Result<Self> {
        let dimensions = points.first().map(|p| p.vector.len()).unwrap_or(0);
        let mut seen = HashSet::with_capacity(points.len());

        for point in &points {
            validate_vector(&point.vector)?;
            if point.vector.len() != dimensions {
                return Err(Error::DimensionMismatch {
                    expected: dimensions,
                    actual: point.vector.len(),
                });
            }
            if !seen.insert(point.id.as_str()) {
                return Err(Error::DuplicateId(point.id.clone()));
            }
        }

        Ok(Self {
            name: name.into(),
            dimensions,
            metric,
            fingerprint: None,
            source: None,
            built_at: Utc::now(),
            points,
        })
    }

    /// Attach a fingerprint identifying the build input.
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// Record where the build input came from.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub(crate) fn with_built_at(mut self, built_at: DateTime<Utc>) -> Self {
        self.built_at = built_at;
        self
    }

    /// Get the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the vector dimensions (0 for an empty collection).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Get the distance metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Get the build fingerprint, if one was attached.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// When this snapshot was built.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Get the number of vectors in the collection.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All stored vectors in insertion order.
    pub fn points(&self) -> &[StoredVector] {
        &self.points
    }

    /// Get a vector by ID.
    pub fn get(&self, id: &str) -> Option<&StoredVector> {
        self.points.iter().find(|p| p.id == id)
    }

    /// Search for the `limit` most similar vectors, best first.
    ///
    /// Returns an empty list for an empty collection or a zero limit.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if self.points.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        validate_vector(query)?;
        if query.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .points
            .iter()
            .enumerate()
            .map(|(ordinal, p)| (ordinal, self.metric.similarity(query, &p.vector)))
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(ordinal, score)| {
                let point = &self.points[ordinal];
                SearchResult {
                    id: point.id.clone(),
                    score,
                    vector: point.vector.clone(),
                    metadata: point.metadata.clone(),
                }
            })
            .collect())
    }

    /// Get collection statistics.
    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            name: self.name.clone(),
            vector_count: self.points.len(),
            dimensions: self.dimensions,
            metric: self.metric,
            fingerprint: self.fingerprint.clone(),
            built_at: self.built_at,
        }
    }
}

fn validate_vector(vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(Error::InvalidVector("vector is empty".to_string()));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidVector(
            "vector contains NaN or infinite components".to_string(),
        ));
    }
    Ok(())
}

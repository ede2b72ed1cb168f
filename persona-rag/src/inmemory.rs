//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `BTreeMap` protected by a `tokio::sync::RwLock`. It is suitable for
//! development, tests, and running the CLI without a hosted index.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{EmbeddedChunk, Match, RetrievalResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

#[derive(Debug, Default)]
struct Index {
    /// Fixed by construction or by the first upsert.
    dimensions: Option<usize>,
    items: BTreeMap<String, EmbeddedChunk>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Items are keyed by id, so re-upserting overwrites. The dimensionality is
/// established by [`with_dimensions`](Self::with_dimensions) or by the first
/// non-empty upsert; later vectors of a different length are rejected.
///
/// # Example
///
/// ```rust,ignore
/// use persona_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::with_dimensions(1536);
/// store.upsert(&items).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    index: RwLock<Index>,
}

impl InMemoryVectorStore {
    /// Create a new empty store whose dimensionality is set by the first upsert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store with a fixed dimensionality.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { index: RwLock::new(Index { dimensions: Some(dimensions), items: BTreeMap::new() }) }
    }

    /// The established dimensionality, if any.
    pub async fn dimensions(&self) -> Option<usize> {
        self.index.read().await.dimensions
    }

    /// Ids of all stored items.
    pub async fn ids(&self) -> BTreeSet<String> {
        self.index.read().await.items.keys().cloned().collect()
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.index.read().await.items.len()
    }

    /// Whether the store holds no items.
    pub async fn is_empty(&self) -> bool {
        self.index.read().await.items.is_empty()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, items: &[EmbeddedChunk]) -> Result<()> {
        let Some(first) = items.first() else {
            return Ok(());
        };

        let mut index = self.index.write().await;
        let expected = index.dimensions.unwrap_or(first.vector.len());

        // Validate the whole batch before touching the map
        if let Some(bad) = items.iter().find(|item| item.vector.len() != expected) {
            return Err(RagError::DimensionMismatch {
                id: bad.id.clone(),
                expected,
                actual: bad.vector.len(),
            });
        }

        index.dimensions = Some(expected);
        for item in items {
            index.items.insert(item.id.clone(), item.clone());
        }

        debug!(backend = BACKEND, count = items.len(), total = index.items.len(), "upserted items");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<RetrievalResult> {
        let index = self.index.read().await;

        if let Some(expected) = index.dimensions {
            if vector.len() != expected {
                return Err(RagError::DimensionMismatch {
                    id: "<query>".to_string(),
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let matches = index
            .items
            .values()
            .map(|item| Match {
                id: item.id.clone(),
                score: cosine_similarity(&item.vector, vector),
                metadata: include_metadata.then(|| item.metadata.clone()),
            })
            .collect();

        Ok(RetrievalResult::new(matches, top_k))
    }

    fn name(&self) -> &str {
        BACKEND
    }
}

//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{EmbeddedChunk, RetrievalResult};
use crate::error::Result;

/// A similarity-search index over [`EmbeddedChunk`]s.
///
/// A store is bound to a single namespace when it is constructed, so the
/// trait only exposes the two operations the pipeline needs.
///
/// # Example
///
/// ```rust,ignore
/// use persona_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert(&embedded_chunks).await?;
/// let result = store.query(&query_vector, 3, true).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite items by id.
    ///
    /// Upserting the same id twice leaves a single entry holding the latest
    /// vector and metadata.
    ///
    /// # Errors
    ///
    /// - [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch) if
    ///   any vector's length differs from the index dimensionality
    /// - [`RagError::BackendUnavailable`](crate::RagError::BackendUnavailable) on transport errors
    async fn upsert(&self, items: &[EmbeddedChunk]) -> Result<()>;

    /// Return at most `top_k` stored items nearest to `vector`, best first.
    ///
    /// If fewer than `top_k` items exist, all of them are returned. Metadata is
    /// only populated when `include_metadata` is set.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<RetrievalResult>;

    /// Backend name used in errors and logs.
    fn name(&self) -> &str;
}

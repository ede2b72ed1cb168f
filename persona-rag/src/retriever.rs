//! Ingest and query paths over a chunker, an embedder and a vector store.

use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::Chunker;
use crate::document::{Document, EmbeddedChunk, RetrievalResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::retry::{RetryPolicy, with_retry};
use crate::vectorstore::VectorStore;

/// Coordinates document ingestion (chunk → embed → upsert) and retrieval
/// (embed → query). Construct one via [`Retriever::builder()`].
///
/// Only [`ingest`](Self::ingest) writes to the vector store. Chunk ids are
/// derived from the document id and chunk position, so ingesting the same
/// document again overwrites the same entries instead of adding new ones.
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    retry: RetryPolicy,
}

impl Retriever {
    /// Create a new [`RetrieverBuilder`].
    pub fn builder() -> RetrieverBuilder {
        RetrieverBuilder::default()
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Ingest a document: chunk → embed → upsert.
    ///
    /// Returns the items that were upserted, in chunk order.
    ///
    /// Entries are only ever overwritten, never deleted. Re-ingesting a
    /// shorter revision under the same document id leaves the old
    /// `{id}-{n}` entries past the new chunk count in the store, where they
    /// can still be retrieved; use a fresh namespace or document id when a
    /// document shrinks.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyInput`] if the document is empty
    /// - [`RagError::DimensionMismatch`] if the embedder and index disagree
    /// - backend errors once retries are exhausted
    pub async fn ingest(&self, document: &Document) -> Result<Vec<EmbeddedChunk>> {
        let chunks = self.chunker.split(document)?;
        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();

        let provider = &self.embedding_provider;
        let batch = texts.as_slice();
        let vectors = with_retry(&self.retry, "embed_batch", move || provider.embed_batch(batch))
            .await
            .inspect_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
            })?;

        if vectors.len() != chunks.len() {
            return Err(RagError::unavailable(
                provider.name(),
                format!("expected {} embeddings, got {}", chunks.len(), vectors.len()),
            ));
        }

        let items: Vec<EmbeddedChunk> =
            chunks.into_iter().zip(vectors).map(|(chunk, vector)| EmbeddedChunk::new(chunk, vector)).collect();

        let store = &self.vector_store;
        let batch = items.as_slice();
        with_retry(&self.retry, "upsert", move || store.upsert(batch)).await.inspect_err(|e| {
            error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
        })?;

        info!(document.id = %document.id, chunk_count = items.len(), store = store.name(), "ingested document");
        Ok(items)
    }

    /// Embed `query` and return at most `top_k` matches with metadata, best first.
    ///
    /// Never writes to the vector store.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyInput`] if the query is blank
    /// - [`RagError::InvalidConfiguration`] if `top_k == 0`
    /// - backend errors once retries are exhausted
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<RetrievalResult> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyInput("query must not be blank".to_string()));
        }
        if top_k == 0 {
            return Err(RagError::InvalidConfiguration(
                "top_k must be greater than zero".to_string(),
            ));
        }

        let provider = &self.embedding_provider;
        let vector = with_retry(&self.retry, "embed", move || provider.embed(query))
            .await
            .inspect_err(|e| error!(error = %e, "embedding failed during query"))?;

        let store = &self.vector_store;
        let vector = vector.as_slice();
        let result = with_retry(&self.retry, "query", move || store.query(vector, top_k, true))
            .await
            .inspect_err(|e| error!(store = store.name(), error = %e, "vector store query failed"))?;

        info!(result_count = result.len(), top_k, "retrieval completed");
        Ok(result)
    }
}

/// Builder for constructing a [`Retriever`].
///
/// The embedding provider, vector store and chunker are required; the retry
/// policy defaults to [`RetryPolicy::default`].
#[derive(Default)]
pub struct RetrieverBuilder {
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    retry: Option<RetryPolicy>,
}

impl RetrieverBuilder {
    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the retry policy for embedding and vector store calls.
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Build the [`Retriever`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if any required field is missing.
    pub fn build(self) -> Result<Retriever> {
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::InvalidConfiguration("embedding_provider is required".to_string())
        })?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::InvalidConfiguration("vector_store is required".to_string()))?;
        let chunker = self
            .chunker
            .ok_or_else(|| RagError::InvalidConfiguration("chunker is required".to_string()))?;

        Ok(Retriever {
            embedding_provider,
            vector_store,
            chunker,
            retry: self.retry.unwrap_or_default(),
        })
    }
}

//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. The default [`embed`](EmbeddingProvider::embed) delegates to
/// [`embed_batch`](EmbeddingProvider::embed_batch) with a single input, so a
/// backend only has to implement the batch call.
///
/// Callers are responsible for keeping every input under the backend's
/// maximum input size; the pipeline guarantees this by chunking first.
///
/// # Example
///
/// ```rust,ignore
/// use persona_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let vectors = provider.embed_batch(&["first", "second"]).await?;
/// assert_eq!(vectors.len(), 2);
/// assert_eq!(vectors[0].len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The output is positionally aligned with `texts`: same length, same order.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyInput`] if `texts` is empty
    /// - [`RagError::RateLimited`] if the backend throttled the request
    /// - [`RagError::BackendUnavailable`] on transport, auth or timeout failures
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(RagError::EmptyInput("cannot embed an empty text".to_string()));
        }
        let mut vectors = self.embed_batch(&[text]).await?;
        vectors.pop().ok_or_else(|| {
            RagError::unavailable(self.name(), "backend returned no embedding for the query")
        })
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Backend name used in errors and logs.
    fn name(&self) -> &str {
        "embedding"
    }
}

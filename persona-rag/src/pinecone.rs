//! Pinecone vector store backend.
//!
//! Provides [`PineconeVectorStore`], which implements [`VectorStore`] against
//! the Pinecone data-plane REST API of a single index host. The similarity
//! metric is the one the Pinecone index was created with (cosine for the
//! reference deployment); scores are passed through unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use persona_rag::pinecone::{PineconeConfig, PineconeVectorStore};
//!
//! let config = PineconeConfig::new("pc-...", "spral-ai-abc123.svc.us-east-1.pinecone.io");
//! let store = PineconeVectorStore::new(config, 1536)?;
//! store.upsert(&items).await?;
//! let result = store.query(&query_vector, 3, true).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::document::{ChunkMetadata, EmbeddedChunk, Match, RetrievalResult};
use crate::error::{RagError, Result};
use crate::http;
use crate::vectorstore::VectorStore;

const BACKEND: &str = "Pinecone";

/// API version pinned in every request.
const API_VERSION: &str = "2024-07";

/// Pinecone's documented maximum is 1000 vectors per upsert; stay well under
/// it so large embeddings also respect the 2 MB request limit.
const UPSERT_BATCH_SIZE: usize = 100;

/// Connection settings for one Pinecone index.
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    /// API key sent in the `Api-Key` header.
    pub api_key: String,
    /// Index host, with or without scheme (`https://` is assumed).
    pub index_host: String,
    /// Namespace inside the index; `""` is Pinecone's default namespace.
    pub namespace: String,
    /// Bound on every request.
    pub timeout: Duration,
}

impl PineconeConfig {
    /// Create a config for the default namespace with a 30 second timeout.
    pub fn new(api_key: impl Into<String>, index_host: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            index_host: index_host.into(),
            namespace: String::new(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Use a named namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A [`VectorStore`] backed by a hosted [Pinecone](https://www.pinecone.io/) index.
///
/// Vector lengths are checked against `dimensions` before any request is
/// sent, so configuration drift between the embedder and the index surfaces
/// as [`RagError::DimensionMismatch`] instead of an opaque HTTP 400.
pub struct PineconeVectorStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    namespace: String,
    dimensions: usize,
}

impl PineconeVectorStore {
    /// Create a store for an index holding `dimensions`-long vectors.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if the API key or host is
    /// empty, or `dimensions` is zero.
    pub fn new(config: PineconeConfig, dimensions: usize) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RagError::InvalidConfiguration(
                "Pinecone API key must not be empty".to_string(),
            ));
        }
        let host = config.index_host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(RagError::InvalidConfiguration(
                "Pinecone index host must not be empty".to_string(),
            ));
        }
        if dimensions == 0 {
            return Err(RagError::InvalidConfiguration(
                "Pinecone index dimensions must be greater than zero".to_string(),
            ));
        }

        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };

        Ok(Self {
            client: http::client(BACKEND, config.timeout)?,
            base_url,
            api_key: config.api_key,
            namespace: config.namespace,
            dimensions,
        })
    }

    /// The namespace this store reads and writes.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn check_dimensions(&self, id: &str, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                id: id.to_string(),
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| http::transport_error(BACKEND, e))?;
        http::check_status(BACKEND, response).await
    }
}

// ── Pinecone API request/response types ────────────────────────────

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
    namespace: &'a str,
}

#[derive(Serialize)]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a ChunkMetadata,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    namespace: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Deserialize)]
struct PineconeMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Value>,
}

impl PineconeMatch {
    fn into_match(self) -> Match {
        let metadata = self
            .metadata
            .as_ref()
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .map(|content| ChunkMetadata { content: content.to_string() });
        Match { id: self.id, score: self.score, metadata }
    }
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    async fn upsert(&self, items: &[EmbeddedChunk]) -> Result<()> {
        for item in items {
            self.check_dimensions(&item.id, &item.vector)?;
        }

        for batch in items.chunks(UPSERT_BATCH_SIZE) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|item| PineconeVector {
                        id: &item.id,
                        values: &item.vector,
                        metadata: &item.metadata,
                    })
                    .collect(),
                namespace: &self.namespace,
            };
            self.post("vectors/upsert", &request).await?;
            debug!(backend = BACKEND, namespace = %self.namespace, count = batch.len(), "upserted batch");
        }

        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<RetrievalResult> {
        self.check_dimensions("<query>", vector)?;

        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            include_values: false,
            namespace: &self.namespace,
        };
        let response = self.post("query", &request).await?;
        let parsed: QueryResponse =
            response.json().await.map_err(|e| http::transport_error(BACKEND, e))?;

        debug!(backend = BACKEND, namespace = %self.namespace, matches = parsed.matches.len(), "query completed");
        let matches = parsed.matches.into_iter().map(PineconeMatch::into_match).collect();
        Ok(RetrievalResult::new(matches, top_k))
    }

    fn name(&self) -> &str {
        BACKEND
    }
}

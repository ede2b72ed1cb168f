//! OpenAI backends: the embeddings API and the chat completions API.
//!
//! Both call the REST endpoints directly with `reqwest` and share an
//! [`OpenAIConfig`] holding the credential, base URL and request timeout.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generator::LanguageModel;
use crate::http;

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// The default chat model used to synthesize answers.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default bound on a single HTTP request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const BACKEND: &str = "OpenAI";

/// Inputs per embeddings request.
const DEFAULT_BATCH_SIZE: usize = 96;

/// Embeddings requests in flight at once.
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Connection settings shared by the OpenAI backends.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Base URL, e.g. `https://api.openai.com/v1` or an OpenAI-compatible server.
    pub base_url: String,
    /// Bound on every request; exceeding it yields `BackendUnavailable`.
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Create a config for the public OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), base_url: OPENAI_API_BASE.to_string(), timeout: DEFAULT_TIMEOUT }
    }

    /// Point at a different OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    fn client(&self) -> Result<reqwest::Client> {
        if self.api_key.trim().is_empty() {
            return Err(RagError::InvalidConfiguration(
                "OpenAI API key must not be empty".to_string(),
            ));
        }
        http::client(BACKEND, self.timeout)
    }
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// Large batches are split into sub-requests of at most `batch_size` inputs.
/// Up to `max_concurrency` sub-requests run at once and their results are
/// reassembled in input order.
///
/// # Example
///
/// ```rust,ignore
/// use persona_rag::openai::{OpenAIConfig, OpenAIEmbeddingProvider};
///
/// let provider = OpenAIEmbeddingProvider::new(OpenAIConfig::new("sk-..."))?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAIConfig,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
    batch_size: usize,
    max_concurrency: usize,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider using `text-embedding-3-small` (1536 dimensions).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if the API key is empty.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        Ok(Self {
            client: config.client()?,
            config,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            request_dimensions: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        })
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions (Matryoshka support).
    ///
    /// When set, the API returns embeddings truncated to this size.
    /// This also updates the value returned by [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    /// Set the maximum number of inputs per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set how many requests may be in flight at once.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// One HTTP round-trip for at most `batch_size` inputs.
    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        debug!(provider = BACKEND, batch_size = texts.len(), model = %self.model, "embedding batch");

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(self.config.endpoint("embeddings"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::transport_error(BACKEND, e))?;
        let response = http::check_status(BACKEND, response).await?;

        let mut parsed: EmbeddingResponse =
            response.json().await.map_err(|e| http::transport_error(BACKEND, e))?;

        if parsed.data.len() != texts.len() {
            error!(provider = BACKEND, expected = texts.len(), got = parsed.data.len(), "short response");
            return Err(RagError::unavailable(
                BACKEND,
                format!("expected {} embeddings, got {}", texts.len(), parsed.data.len()),
            ));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(RagError::EmptyInput("no texts to embed".to_string()));
        }
        if let Some(pos) = texts.iter().position(|t| t.is_empty()) {
            return Err(RagError::EmptyInput(format!("text at position {pos} is empty")));
        }

        let requests: Vec<_> =
            texts.chunks(self.batch_size).map(|batch| self.request(batch)).collect();
        let batches: Vec<Vec<Vec<f32>>> =
            stream::iter(requests).buffered(self.max_concurrency).try_collect().await?;

        Ok(batches.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        BACKEND
    }
}

// ── Chat completions ───────────────────────────────────────────────

/// A [`LanguageModel`] backed by the OpenAI chat completions API.
///
/// The prompt is sent as a single user message and the first choice's
/// content is returned unmodified.
///
/// # Example
///
/// ```rust,ignore
/// use persona_rag::openai::{OpenAIChatModel, OpenAIConfig};
///
/// let model = OpenAIChatModel::new(OpenAIConfig::new("sk-..."))?.with_temperature(0.2);
/// let text = model.complete("Say hello").await?;
/// ```
pub struct OpenAIChatModel {
    client: reqwest::Client,
    config: OpenAIConfig,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAIChatModel {
    /// Create a new chat model client using [`DEFAULT_CHAT_MODEL`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if the API key is empty.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        Ok(Self {
            client: config.client()?,
            config,
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        })
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the completion length.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(provider = BACKEND, model = %self.model, prompt_len = prompt.len(), "requesting completion");

        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::transport_error(BACKEND, e))?;
        let response = http::check_status(BACKEND, response).await?;

        let parsed: ChatResponse =
            response.json().await.map_err(|e| http::transport_error(BACKEND, e))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| RagError::EmptyCompletion { backend: BACKEND.to_string() })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

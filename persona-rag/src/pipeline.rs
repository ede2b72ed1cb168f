//! Question-answering pipeline orchestrator.
//!
//! The [`RagPipeline`] runs the stages ingest → retrieve → build → answer,
//! each exposed as its own method with typed inputs and outputs so callers
//! (and tests) can drive them one at a time.
//!
//! # Example
//!
//! ```rust,ignore
//! use persona_rag::{Document, InMemoryVectorStore, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .language_model(Arc::new(model))
//!     .build()?;
//!
//! pipeline.ingest(&Document::new(biography)).await?;
//! let outcome = pipeline.ask("How old were you when you got into programming?").await?;
//! println!("{}", outcome.answer.text);
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Answer, Document, EmbeddedChunk, PromptContext, RetrievalResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generator::{AnswerGenerator, LanguageModel};
use crate::prompt::PromptBuilder;
use crate::retriever::Retriever;
use crate::retry::RetryPolicy;
use crate::vectorstore::VectorStore;

/// Returned without calling the model when retrieval finds nothing usable.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "I don't have enough information about that to give you an answer.";

/// Returned when the model keeps producing empty completions.
pub const DEGRADED_ANSWER: &str = "I'm unable to generate a response right now.";

/// The answer to a question together with the context that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Retrieved matches, best first, after any similarity threshold.
    pub retrieval: RetrievalResult,
    /// The final answer.
    pub answer: Answer,
}

/// The RAG pipeline orchestrator. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Stage 1: chunk, embed and upsert the document. Safe to repeat.
    pub async fn ingest(&self, document: &Document) -> Result<Vec<EmbeddedChunk>> {
        self.retriever.ingest(document).await
    }

    /// Stage 2: fetch the configured `top_k` matches. When a similarity
    /// threshold is configured, matches below it are dropped.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        let result = self.retriever.retrieve(question, self.config.top_k).await?;
        Ok(match self.config.similarity_threshold {
            Some(threshold) => result.above_threshold(threshold),
            None => result,
        })
    }

    /// Stage 3: assemble the prompt inputs.
    pub fn build_context(&self, retrieval: &RetrievalResult, question: &str) -> PromptContext {
        PromptContext::from_retrieval(retrieval, question)
    }

    /// Stage 4: generate the answer.
    ///
    /// An empty completion is retried once; if the second attempt is also
    /// empty a degraded answer ([`DEGRADED_ANSWER`]) is returned instead of an error.
    pub async fn answer(&self, context: &PromptContext) -> Result<Answer> {
        match self.generator.answer(context).await {
            Err(RagError::EmptyCompletion { backend }) => {
                warn!(backend = %backend, "empty completion, retrying once");
                match self.generator.answer(context).await {
                    Err(RagError::EmptyCompletion { backend }) => {
                        warn!(backend = %backend, "empty completion again, returning degraded answer");
                        Ok(Answer::degraded(DEGRADED_ANSWER))
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    /// Run retrieve → build → answer for one question.
    ///
    /// When no match survives retrieval the model is not called and the
    /// answer is [`INSUFFICIENT_CONTEXT_ANSWER`].
    pub async fn ask(&self, question: &str) -> Result<QueryOutcome> {
        let retrieval = self.retrieve(question).await?;

        let answer = if retrieval.context().trim().is_empty() {
            info!("no usable context retrieved");
            Answer::degraded(INSUFFICIENT_CONTEXT_ANSWER)
        } else {
            let context = self.build_context(&retrieval, question);
            self.answer(&context).await?
        };

        Ok(QueryOutcome { retrieval, answer })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The embedding provider, vector store and language model are required.
/// The chunker defaults to a [`RecursiveChunker`] sized from the config and
/// the prompt to [`PromptBuilder::default`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .language_model(Arc::new(model))
///     .prompt(PromptBuilder::new("Spral"))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    language_model: Option<Arc<dyn LanguageModel>>,
    prompt: Option<PromptBuilder>,
    retry: Option<RetryPolicy>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

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

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the language model used for answers.
    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(model);
        self
    }

    /// Override the prompt template.
    pub fn prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Set the retry policy applied to every backend call.
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Build the [`RagPipeline`], validating the config and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if the config is invalid or
    /// any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::from_config(&config)?),
        };
        let language_model = self.language_model.ok_or_else(|| {
            RagError::InvalidConfiguration("language_model is required".to_string())
        })?;
        let retry = self.retry.unwrap_or_default();

        let mut retriever = Retriever::builder().chunker(chunker).retry_policy(retry.clone());
        if let Some(provider) = self.embedding_provider {
            retriever = retriever.embedding_provider(provider);
        }
        if let Some(store) = self.vector_store {
            retriever = retriever.vector_store(store);
        }
        let retriever = retriever.build()?;

        let generator = AnswerGenerator::new(language_model, self.prompt.unwrap_or_default())
            .with_retry_policy(retry);

        Ok(RagPipeline { config, retriever, generator })
    }
}

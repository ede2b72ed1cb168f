//! Answer synthesis with a language model.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::document::{Answer, PromptContext};
use crate::error::Result;
use crate::prompt::PromptBuilder;
use crate::retry::{RetryPolicy, with_retry};

/// A text-completion backend.
///
/// # Example
///
/// ```rust,ignore
/// use persona_rag::LanguageModel;
///
/// let text = model.complete("Answer in one word: what colour is the sky?").await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send `prompt` and return the completion text unmodified.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyCompletion`](crate::RagError::EmptyCompletion) if the backend returned no text
    /// - [`RagError::RateLimited`](crate::RagError::RateLimited) /
    ///   [`RagError::BackendUnavailable`](crate::RagError::BackendUnavailable) on transport failures
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model name used in logs.
    fn name(&self) -> &str;
}

/// Renders the persona prompt and asks the language model for an answer.
///
/// Transient backend failures are retried according to the configured
/// [`RetryPolicy`]. An empty completion is returned as an error so the caller
/// can decide whether to retry or degrade.
pub struct AnswerGenerator {
    model: Arc<dyn LanguageModel>,
    prompt: PromptBuilder,
    retry: RetryPolicy,
}

impl AnswerGenerator {
    /// Create a generator with the default [`RetryPolicy`].
    pub fn new(model: Arc<dyn LanguageModel>, prompt: PromptBuilder) -> Self {
        Self { model, prompt, retry: RetryPolicy::default() }
    }

    /// Replace the retry policy for completion calls.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The prompt builder in use.
    pub fn prompt(&self) -> &PromptBuilder {
        &self.prompt
    }

    /// Render the prompt for `context` and return the model's completion.
    ///
    /// # Errors
    ///
    /// Propagates [`RagError::MissingVariable`](crate::RagError::MissingVariable)
    /// from rendering, and the model's errors once retries are exhausted.
    pub async fn answer(&self, context: &PromptContext) -> Result<Answer> {
        let prompt = self.prompt.build(&context.context, &context.question)?;
        debug!(model = self.model.name(), prompt_len = prompt.len(), "rendered prompt");

        let model = &self.model;
        let prompt = prompt.as_str();
        let text = with_retry(&self.retry, "complete", move || model.complete(prompt)).await?;

        info!(model = self.model.name(), answer_len = text.len(), "answer generated");
        Ok(Answer::new(text))
    }
}

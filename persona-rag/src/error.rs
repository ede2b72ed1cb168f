//! Error types for the `persona-rag` crate.

use thiserror::Error;

/// Errors that can occur anywhere in the retrieval and answering pipeline.
///
/// Backend-facing variants carry the name of the backend that failed so a
/// single log line identifies the culprit (`OpenAI`, `Pinecone`, `InMemory`).
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunking parameters, templates or credentials are unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The caller supplied an empty document, query or batch.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A backend could not be reached, rejected our credentials, timed out
    /// or returned a malformed response.
    #[error("Backend unavailable ({backend}): {message}")]
    BackendUnavailable {
        /// The backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A backend throttled the request.
    #[error("Rate limited ({backend}): {message}")]
    RateLimited {
        /// The backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector does not match the dimensionality established for the index.
    #[error("Dimension mismatch for '{id}': expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The offending item id (`<query>` for query vectors).
        id: String,
        /// The index dimensionality.
        expected: usize,
        /// The vector length that was supplied.
        actual: usize,
    },

    /// A prompt variable had no value at render time.
    #[error("Missing prompt variable: {0}")]
    MissingVariable(String),

    /// The language model returned no text.
    #[error("Empty completion from {backend}")]
    EmptyCompletion {
        /// The model backend that produced the empty completion.
        backend: String,
    },
}

impl RagError {
    pub(crate) fn unavailable(backend: &str, message: impl Into<String>) -> Self {
        Self::BackendUnavailable { backend: backend.to_string(), message: message.into() }
    }

    pub(crate) fn rate_limited(backend: &str, message: impl Into<String>) -> Self {
        Self::RateLimited { backend: backend.to_string(), message: message.into() }
    }

    /// Whether the failure is worth retrying with backoff.
    ///
    /// Only throttling and availability errors are transient. Configuration,
    /// input and dimensionality errors will fail the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. } | Self::RateLimited { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_backend_failures_are_transient() {
        assert!(RagError::unavailable("OpenAI", "timeout").is_transient());
        assert!(RagError::rate_limited("Pinecone", "429").is_transient());

        assert!(!RagError::InvalidConfiguration("bad".into()).is_transient());
        assert!(!RagError::EmptyInput("document".into()).is_transient());
        assert!(!RagError::MissingVariable("context".into()).is_transient());
        assert!(!RagError::EmptyCompletion { backend: "OpenAI".into() }.is_transient());
        assert!(
            !RagError::DimensionMismatch { id: "doc-0".into(), expected: 3, actual: 2 }
                .is_transient()
        );
    }

    #[test]
    fn messages_name_the_backend() {
        let err = RagError::rate_limited("Pinecone", "slow down");
        assert_eq!(err.to_string(), "Rate limited (Pinecone): slow down");
    }
}

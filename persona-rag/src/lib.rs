//! # persona-rag
//!
//! Retrieval-augmented question answering over a single source document,
//! answered in the voice of a configurable persona.
//!
//! The crate is organised as a staged pipeline:
//!
//! 1. [`Chunker`] splits the document into overlapping chunks
//! 2. [`EmbeddingProvider`] turns chunks and questions into vectors
//! 3. [`VectorStore`] stores chunk vectors and answers nearest-neighbour queries
//! 4. [`Retriever`] runs the ingest path and the query path over the three above
//! 5. [`PromptBuilder`] renders the persona prompt from context and question
//! 6. [`AnswerGenerator`] sends the prompt to a [`LanguageModel`]
//!
//! [`RagPipeline`] wires the stages together. Every backend is an explicit
//! trait object passed in at construction, so tests can substitute stubs.
//!
//! ## Backends
//!
//! - [`openai::OpenAIEmbeddingProvider`] and [`openai::OpenAIChatModel`]
//! - [`pinecone::PineconeVectorStore`] for a hosted index
//! - [`InMemoryVectorStore`] for local runs and tests

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generator;
mod http;
pub mod inmemory;
pub mod openai;
pub mod pinecone;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod retry;
pub mod vectorstore;

pub use chunking::{Chunker, RecursiveChunker, stitch};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{
    Answer, CONTEXT_SEPARATOR, Chunk, ChunkMetadata, DEFAULT_DOCUMENT_ID, Document, EmbeddedChunk,
    Match, PromptContext, RetrievalResult,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generator::{AnswerGenerator, LanguageModel};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{
    DEGRADED_ANSWER, INSUFFICIENT_CONTEXT_ANSWER, QueryOutcome, RagPipeline, RagPipelineBuilder,
};
pub use prompt::{DEFAULT_PERSONA, DEFAULT_TEMPLATE, PromptBuilder};
pub use retriever::{Retriever, RetrieverBuilder};
pub use retry::{RetryPolicy, with_retry};
pub use vectorstore::VectorStore;

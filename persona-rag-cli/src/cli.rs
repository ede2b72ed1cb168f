//! Command-line parsing for the `persona-rag` binary.
//!
//! Every setting can come from a flag or an environment variable; a `.env`
//! file in the working directory is loaded before parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use persona_rag::openai::{
    DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, OPENAI_API_BASE,
    OpenAIConfig,
};
use persona_rag::pinecone::PineconeConfig;
use persona_rag::{RagConfig, Result};

/// Ask questions about a biography and get answers in its subject's voice.
#[derive(Parser, Debug)]
#[command(
    name = "persona-rag",
    version,
    about = "Retrieval-augmented answers about a persona document",
    after_help = "EXAMPLES:\n    \
                  persona-rag ingest --document bio.txt\n    \
                  persona-rag ask \"What projects have you built?\" --document bio.txt\n    \
                  persona-rag ask \"Where did you study?\" --index memory --show-context"
)]
pub struct Cli {
    /// Log backend requests and pipeline stages at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chunk, embed and upsert the document into the index
    ///
    /// Safe to repeat: chunk ids are stable, so existing entries are overwritten.
    Ingest {
        #[command(flatten)]
        settings: Settings,
    },

    /// Answer a question from the indexed document
    Ask {
        /// The question to answer
        question: String,

        /// Print the retrieved chunks and their scores to stderr
        #[arg(long)]
        show_context: bool,

        #[command(flatten)]
        settings: Settings,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Hosted Pinecone index
    Pinecone,
    /// Process-local index, rebuilt on every run
    Memory,
}

/// Backend and pipeline settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Plain-text document describing the persona; needed to ingest, and to
    /// ask against the memory index
    #[arg(long, env = "PERSONA_RAG_DOCUMENT")]
    pub document: Option<PathBuf>,

    /// Who the model should speak as
    #[arg(long, env = "PERSONA_RAG_PERSONA")]
    pub persona: Option<String>,

    /// File holding a custom prompt template with {context} and {question}
    #[arg(long, env = "PERSONA_RAG_TEMPLATE")]
    pub template: Option<PathBuf>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = OPENAI_API_BASE)]
    pub openai_base_url: String,

    #[arg(long, env = "PERSONA_RAG_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Vector length; must match the index
    #[arg(long, env = "PERSONA_RAG_EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    pub embedding_dimensions: usize,

    #[arg(long, env = "PERSONA_RAG_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub chat_model: String,

    #[arg(long, value_enum, env = "PERSONA_RAG_INDEX", default_value_t = IndexKind::Pinecone)]
    pub index: IndexKind,

    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: Option<String>,

    /// Data-plane host of the Pinecone index
    #[arg(long, env = "PINECONE_INDEX_HOST")]
    pub pinecone_host: Option<String>,

    #[arg(long, env = "PINECONE_NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Maximum chunk length in characters
    #[arg(long, env = "PERSONA_RAG_CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters shared by neighbouring chunks, at most
    #[arg(long, env = "PERSONA_RAG_CHUNK_OVERLAP", default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Chunks retrieved per question
    #[arg(long, env = "PERSONA_RAG_TOP_K", default_value_t = 3)]
    pub top_k: usize,

    /// Drop matches scoring below this; unset keeps every match up to --top-k
    #[arg(long, env = "PERSONA_RAG_MIN_SCORE")]
    pub min_score: Option<f32>,

    /// Per-request timeout for every backend
    #[arg(long, env = "PERSONA_RAG_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Settings {
    /// Validated pipeline parameters.
    pub fn rag_config(&self) -> Result<RagConfig> {
        let mut builder = RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k);
        if let Some(min_score) = self.min_score {
            builder = builder.similarity_threshold(min_score);
        }
        builder.build()
    }

    pub fn openai_config(&self) -> OpenAIConfig {
        OpenAIConfig::new(&self.openai_api_key)
            .with_base_url(&self.openai_base_url)
            .with_timeout(self.timeout())
    }

    /// Missing credentials are left empty for the store to reject.
    pub fn pinecone_config(&self) -> PineconeConfig {
        PineconeConfig::new(
            self.pinecone_api_key.clone().unwrap_or_default(),
            self.pinecone_host.clone().unwrap_or_default(),
        )
        .with_namespace(&self.namespace)
        .with_timeout(self.timeout())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

//! Data types that flow between the pipeline stages.
//!
//! Ingest path: [`Document`] → [`Chunk`] → [`EmbeddedChunk`].
//! Query path: [`Match`] → [`RetrievalResult`] → [`PromptContext`] → [`Answer`].

use serde::{Deserialize, Serialize};

/// Id given to a [`Document`] built with [`Document::new`].
///
/// Chunk ids are derived from it (`doc-0`, `doc-1`, ...), which keeps
/// re-ingestion of the same document idempotent.
pub const DEFAULT_DOCUMENT_ID: &str = "doc";

/// Separator placed between matched chunk contents when building the prompt context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// The source document the assistant answers questions about.
///
/// The pipeline treats `text` as opaque; it is supplied at startup from a
/// file or an injected string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier used as the prefix of every chunk id.
    pub id: String,
    /// The full text of the document.
    pub text: String,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with the [`DEFAULT_DOCUMENT_ID`].
    pub fn new(text: impl Into<String>) -> Self {
        Self { id: DEFAULT_DOCUMENT_ID.to_string(), text: text.into(), source_uri: None }
    }

    /// Override the document id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Record where the text was loaded from.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }

    /// The deterministic id of the chunk at `sequence_index`.
    pub fn chunk_id(&self, sequence_index: usize) -> String {
        format!("{}-{sequence_index}", self.id)
    }
}

/// A contiguous segment of a [`Document`], produced by a [`Chunker`](crate::Chunker).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Deterministic id, `{document_id}-{sequence_index}`.
    pub id: String,
    /// The chunk text, a verbatim slice of the document.
    pub content: String,
    /// Position of the chunk in the split sequence, starting at zero.
    pub sequence_index: usize,
    /// Offset of the first character of `content` in the document, in chars.
    pub offset: usize,
}

impl Chunk {
    /// Length of the content in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Offset one past the last character of `content`, in chars.
    pub fn end(&self) -> usize {
        self.offset + self.char_len()
    }
}

/// Metadata stored alongside every vector in the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// The chunk text the vector was computed from.
    pub content: String,
}

/// A chunk's embedding ready to be upserted into a [`VectorStore`](crate::VectorStore).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedChunk {
    /// Same id as the source [`Chunk`]; upserts overwrite by id.
    pub id: String,
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// Payload returned with query matches.
    pub metadata: ChunkMetadata,
}

impl EmbeddedChunk {
    /// Pair a chunk with its embedding.
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self { id: chunk.id, vector, metadata: ChunkMetadata { content: chunk.content } }
    }
}

/// One nearest-neighbour hit returned by a [`VectorStore`](crate::VectorStore).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    /// Id of the stored item.
    pub id: String,
    /// Similarity score, higher is more relevant. The metric is defined by the store.
    pub score: f32,
    /// Stored metadata, present when the query asked for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChunkMetadata>,
}

impl Match {
    /// The matched chunk text, if metadata was requested.
    pub fn content(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.content.as_str())
    }
}

/// Matches ordered by non-increasing score.
///
/// The only way to build one is [`RetrievalResult::new`], which sorts and
/// truncates, so every value upholds the ordering invariant regardless of
/// what a backend returned.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RetrievalResult {
    matches: Vec<Match>,
}

impl RetrievalResult {
    /// Order `matches` by descending score and keep at most `top_k` of them.
    ///
    /// Matches with a NaN score are discarded. Equal scores keep their
    /// original relative order.
    pub fn new(mut matches: Vec<Match>, top_k: usize) -> Self {
        matches.retain(|m| !m.score.is_nan());
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Self { matches }
    }

    /// An empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The matches, best first.
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Consume the result, returning the matches best first.
    pub fn into_matches(self) -> Vec<Match> {
        self.matches
    }

    /// Number of matches.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether there are no matches.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Iterate over the matches, best first.
    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    /// Ids of the matches, best first.
    pub fn ids(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.id.as_str()).collect()
    }

    /// Drop matches scoring below `threshold`. Order is preserved.
    pub fn above_threshold(mut self, threshold: f32) -> Self {
        self.matches.retain(|m| m.score >= threshold);
        self
    }

    /// Join the contents of all matches with [`CONTEXT_SEPARATOR`].
    ///
    /// Matches without metadata contribute nothing.
    pub fn context(&self) -> String {
        self.matches.iter().filter_map(Match::content).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
    }
}

impl<'a> IntoIterator for &'a RetrievalResult {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

/// The two values substituted into the prompt template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptContext {
    /// Retrieved chunk contents joined with [`CONTEXT_SEPARATOR`].
    pub context: String,
    /// The user's question, verbatim.
    pub question: String,
}

impl PromptContext {
    /// Create a prompt context from explicit values.
    pub fn new(context: impl Into<String>, question: impl Into<String>) -> Self {
        Self { context: context.into(), question: question.into() }
    }

    /// Build the context from retrieved matches.
    pub fn from_retrieval(retrieval: &RetrievalResult, question: impl Into<String>) -> Self {
        Self::new(retrieval.context(), question)
    }
}

/// The final response to a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    /// The answer text.
    pub text: String,
    /// `true` when the text is a fallback rather than a model completion.
    #[serde(default)]
    pub degraded: bool,
}

impl Answer {
    /// An answer produced by the language model.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), degraded: false }
    }

    /// A fallback answer produced without a usable completion.
    pub fn degraded(text: impl Into<String>) -> Self {
        Self { text: text.into(), degraded: true }
    }
}

//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits text hierarchically by paragraphs, lines, then words, falling back
//! to single characters only for a run longer than the chunk size.
//!
//! Sizes are measured in characters (Unicode scalar values), never bytes.
//! Every chunk is a verbatim slice of the document, so [`stitch`] rebuilds
//! the original text exactly.

use crate::config::RagConfig;
use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// Separators tried in order: paragraph, line, word.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// A strategy for splitting a document into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyInput`] if the document text is empty.
    fn split(&self, document: &Document) -> Result<Vec<Chunk>>;
}

/// Splits text on natural boundaries with a bounded overlap between chunks.
///
/// The text is cut into segments at paragraph (`\n\n`), line (`\n`) and word
/// (` `) separators, each separator staying attached to the front of the
/// segment that follows it. A segment still longer than `chunk_size` is cut
/// into single characters. Segments are then packed greedily into chunks of
/// at most `chunk_size` characters.
///
/// Each chunk after the first re-opens with the longest run of whole trailing
/// segments of the previous chunk that fits in `chunk_overlap` characters, so
/// the overlap never severs a word.
///
/// # Example
///
/// ```rust,ignore
/// use persona_rag::{Chunker, Document, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(20, 5)?;
/// let chunks = chunker.split(&Document::new("Alice loves Go. Bob loves Rust."))?;
/// assert_eq!(chunks[0].content, "Alice loves Go. Bob");
/// assert_eq!(chunks[1].content, " Bob loves Rust.");
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - maximum number of characters shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidConfiguration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::InvalidConfiguration(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from the chunking fields of a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Maximum chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Maximum overlap in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Pack segments into `(first, last_exclusive)` segment ranges.
    fn pack(&self, segments: &[Segment<'_>]) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        let mut start = 0;
        let mut len = 0;

        for (i, segment) in segments.iter().enumerate() {
            if len + segment.chars > self.chunk_size && i > start {
                ranges.push((start, i));

                // Re-open with whole trailing segments that fit in the overlap
                let mut next = i;
                let mut carried = 0;
                while next > start && carried + segments[next - 1].chars <= self.chunk_overlap {
                    next -= 1;
                    carried += segments[next].chars;
                }
                while carried + segment.chars > self.chunk_size {
                    carried -= segments[next].chars;
                    next += 1;
                }
                start = next;
                len = carried;
            }
            len += segment.chars;
        }

        if start < segments.len() {
            ranges.push((start, segments.len()));
        }
        ranges
    }
}

/// A contiguous slice of the document that is never cut further.
#[derive(Debug, Clone, Copy)]
struct Segment<'a> {
    text: &'a str,
    /// Byte offset of `text` in the document.
    byte_start: usize,
    /// Length of `text` in chars.
    chars: usize,
}

/// Split `text` at every occurrence of `separator`, keeping the separator at
/// the front of the following piece. Returns `(byte_offset, piece)` pairs.
fn split_before<'a>(text: &'a str, separator: &str) -> Vec<(usize, &'a str)> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push((start, &text[start..pos]));
            start = pos;
        }
    }

    if start < text.len() {
        pieces.push((start, &text[start..]));
    }

    pieces
}

/// Recursively cut `text` into segments of at most `max_chars` characters.
fn segment<'a>(
    text: &'a str,
    byte_start: usize,
    max_chars: usize,
    separators: &[&str],
    out: &mut Vec<Segment<'a>>,
) {
    let chars = text.chars().count();
    if chars <= max_chars {
        out.push(Segment { text, byte_start, chars });
        return;
    }

    let Some((separator, remaining)) = separators.split_first() else {
        // No natural boundary left: every character is its own segment
        for (pos, c) in text.char_indices() {
            let end = pos + c.len_utf8();
            out.push(Segment { text: &text[pos..end], byte_start: byte_start + pos, chars: 1 });
        }
        return;
    };

    if !text.contains(separator) {
        segment(text, byte_start, max_chars, remaining, out);
        return;
    }

    for (pos, piece) in split_before(text, separator) {
        segment(piece, byte_start + pos, max_chars, remaining, out);
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, document: &Document) -> Result<Vec<Chunk>> {
        let text = document.text.as_str();
        if text.is_empty() {
            return Err(RagError::EmptyInput(format!("document '{}' has no text", document.id)));
        }

        let mut segments = Vec::new();
        segment(text, 0, self.chunk_size, &SEPARATORS, &mut segments);

        // Char offset of each segment start
        let mut offsets = Vec::with_capacity(segments.len());
        let mut running = 0;
        for segment in &segments {
            offsets.push(running);
            running += segment.chars;
        }

        let chunks = self
            .pack(&segments)
            .into_iter()
            .enumerate()
            .map(|(sequence_index, (first, last))| {
                let byte_start = segments[first].byte_start;
                let tail = &segments[last - 1];
                let byte_end = tail.byte_start + tail.text.len();
                Chunk {
                    id: document.chunk_id(sequence_index),
                    content: text[byte_start..byte_end].to_string(),
                    sequence_index,
                    offset: offsets[first],
                }
            })
            .collect();

        Ok(chunks)
    }
}

/// Rebuild the original text from chunks by dropping each chunk's overlap
/// with the text already covered.
///
/// Expects chunks in sequence order, as returned by [`Chunker::split`].
pub fn stitch(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    let mut covered = 0usize;

    for chunk in chunks {
        let skip = covered.saturating_sub(chunk.offset);
        text.extend(chunk.content.chars().skip(skip));
        covered = covered.max(chunk.end());
    }

    text
}

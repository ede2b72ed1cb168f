//! Deterministic stand-ins for the hosted backends.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use persona_rag::{
    EmbeddedChunk, EmbeddingProvider, LanguageModel, Match, RagError, Result, RetrievalResult,
    VectorStore,
};

/// Hash-based embeddings: the same text always maps to the same unit vector.
pub struct HashEmbedder {
    pub dimensions: usize,
    pub batch_calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, batch_calls: AtomicUsize::new(0) }
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb = vec![0.0f32; self.dimensions];
        for (i, v) in emb.iter_mut().enumerate() {
            *v = ((hash.wrapping_add(i as u64)) as f32).sin();
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        emb
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if texts.is_empty() {
            return Err(RagError::EmptyInput("no texts to embed".to_string()));
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "Hash"
    }
}

/// Two-dimensional embeddings that point questions (text containing `?`) and
/// statements in nearly opposite directions, so every match scores below zero.
pub struct AxisEmbedder;

#[async_trait]
impl EmbeddingProvider for AxisEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(RagError::EmptyInput("no texts to embed".to_string()));
        }
        Ok(texts
            .iter()
            .map(|t| if t.contains('?') { vec![1.0, 0.0] } else { vec![-0.2, 1.0] })
            .collect())
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Fails the first `failures` batch calls with `RateLimited`, then delegates.
pub struct FlakyEmbedder {
    pub inner: HashEmbedder,
    pub failures: usize,
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(RagError::RateLimited {
                backend: "Flaky".to_string(),
                message: "slow down".to_string(),
            });
        }
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions
    }
}

/// An index that ignores the query vector and scores stored ids from a fixed table.
///
/// Matches are returned worst first so callers must rely on `RetrievalResult` ordering.
pub struct FixedScoreIndex {
    pub scores: HashMap<String, f32>,
    pub items: Mutex<Vec<EmbeddedChunk>>,
}

impl FixedScoreIndex {
    pub fn new(scores: &[(&str, f32)]) -> Self {
        Self {
            scores: scores.iter().map(|(id, s)| (id.to_string(), *s)).collect(),
            items: Mutex::default(),
        }
    }
}

#[async_trait]
impl VectorStore for FixedScoreIndex {
    async fn upsert(&self, items: &[EmbeddedChunk]) -> Result<()> {
        let mut stored = self.items.lock().unwrap();
        for item in items {
            stored.retain(|existing| existing.id != item.id);
            stored.push(item.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        _vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<RetrievalResult> {
        let stored = self.items.lock().unwrap();
        let mut matches: Vec<Match> = stored
            .iter()
            .map(|item| Match {
                id: item.id.clone(),
                score: self.scores.get(&item.id).copied().unwrap_or(0.0),
                metadata: include_metadata.then(|| item.metadata.clone()),
            })
            .collect();
        matches.sort_by(|a, b| a.score.total_cmp(&b.score));
        Ok(RetrievalResult::new(matches, top_k))
    }

    fn name(&self) -> &str {
        "FixedScore"
    }
}

/// Replies from a script, one entry per call; `None` is an empty completion.
/// The last entry repeats once the script runs out.
pub struct ScriptedModel {
    pub replies: Vec<Option<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: &[Option<&str>]) -> Self {
        Self {
            replies: replies.iter().map(|r| r.map(str::to_string)).collect(),
            prompts: Mutex::default(),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::new(&[Some(reply)])
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut prompts = self.prompts.lock().unwrap();
        let call = prompts.len();
        prompts.push(prompt.to_string());
        let reply = self.replies.get(call).or(self.replies.last()).cloned().flatten();
        reply.ok_or(RagError::EmptyCompletion { backend: "Scripted".to_string() })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

//! Subcommand handlers: wire the backends from settings and run the pipeline.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use persona_rag::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
use persona_rag::pinecone::PineconeVectorStore;
use persona_rag::{
    DEFAULT_DOCUMENT_ID, DEFAULT_PERSONA, Document, InMemoryVectorStore, PromptBuilder, QueryOutcome, RagPipeline,
    VectorStore,
};
use tracing::{info, warn};

use crate::cli::{Command, IndexKind, Settings};

pub async fn run(command: Command) -> Result<()> {
    match command {
        Command::Ingest { settings } => ingest(&settings).await,
        Command::Ask { question, show_context, settings } => {
            ask(&settings, &question, show_context).await
        }
    }
}

async fn ingest(settings: &Settings) -> Result<()> {
    if settings.index == IndexKind::Memory {
        warn!("the memory index is discarded on exit; use `ask` directly instead");
    }

    let path = require_document(settings)?;
    let pipeline = build_pipeline(settings).await?;
    let document = load_document(path).await?;
    let stored = pipeline.ingest(&document).await.context("ingestion failed")?;

    println!(
        "Ingested {} chunks from {} into {}",
        stored.len(),
        path.display(),
        pipeline.retriever().vector_store().name()
    );
    Ok(())
}

async fn ask(settings: &Settings, question: &str, show_context: bool) -> Result<()> {
    let pipeline = build_pipeline(settings).await?;

    if settings.index == IndexKind::Memory {
        let document = load_document(require_document(settings)?).await?;
        pipeline.ingest(&document).await.context("ingestion failed")?;
    }

    let outcome = pipeline.ask(question).await.context("failed to answer the question")?;
    if show_context {
        eprint!("{}", render_context(&outcome));
    }
    if outcome.answer.degraded {
        info!("answer produced without a model completion");
    }

    println!("{}", outcome.answer.text);
    Ok(())
}

async fn build_pipeline(settings: &Settings) -> Result<RagPipeline> {
    let openai = settings.openai_config();

    let embedder = OpenAIEmbeddingProvider::new(openai.clone())?
        .with_model(&settings.embedding_model)
        .with_dimensions(settings.embedding_dimensions);
    let model = OpenAIChatModel::new(openai)?.with_model(&settings.chat_model);

    let store: Arc<dyn VectorStore> = match settings.index {
        IndexKind::Pinecone => Arc::new(PineconeVectorStore::new(
            settings.pinecone_config(),
            settings.embedding_dimensions,
        )?),
        IndexKind::Memory => {
            Arc::new(InMemoryVectorStore::with_dimensions(settings.embedding_dimensions))
        }
    };

    let pipeline = RagPipeline::builder()
        .config(settings.rag_config()?)
        .embedding_provider(Arc::new(embedder))
        .vector_store(store)
        .language_model(Arc::new(model))
        .prompt(load_prompt(settings).await?)
        .build()?;
    Ok(pipeline)
}

/// The document path, which only `ingest` and the memory index need.
fn require_document(settings: &Settings) -> Result<&Path> {
    settings
        .document
        .as_deref()
        .context("no document given; pass --document or set PERSONA_RAG_DOCUMENT")
}

async fn load_document(path: &Path) -> Result<Document> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read document {}", path.display()))?;
    let id = path.file_stem().and_then(|s| s.to_str()).filter(|s| !s.is_empty());
    let id = id.unwrap_or(DEFAULT_DOCUMENT_ID);
    Ok(Document::new(text).with_id(id).with_source_uri(path.display().to_string()))
}

async fn load_prompt(settings: &Settings) -> Result<PromptBuilder> {
    let persona = settings.persona.as_deref().unwrap_or(DEFAULT_PERSONA);
    match &settings.template {
        Some(path) => {
            let template = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read prompt template {}", path.display()))?;
            Ok(PromptBuilder::with_template(&template, persona)?)
        }
        None => Ok(PromptBuilder::new(persona)),
    }
}

fn render_context(outcome: &QueryOutcome) -> String {
    if outcome.retrieval.is_empty() {
        return "(no context retrieved)\n".to_string();
    }
    outcome
        .retrieval
        .iter()
        .map(|m| format!("[{:.3}] {}\n{}\n\n", m.score, m.id, m.content().unwrap_or_default()))
        .collect()
}

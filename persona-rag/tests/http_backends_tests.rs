//! The OpenAI and Pinecone clients against a local mock server.

use std::sync::Arc;
use std::time::Duration;

use persona_rag::openai::{OpenAIChatModel, OpenAIConfig, OpenAIEmbeddingProvider};
use persona_rag::pinecone::{PineconeConfig, PineconeVectorStore};
use persona_rag::{
    ChunkMetadata, Document, EmbeddedChunk, EmbeddingProvider, InMemoryVectorStore, LanguageModel,
    PromptBuilder, RagConfig, RagError, RagPipeline, RetryPolicy, VectorStore,
};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Answers an embeddings request with `[text length, position, 1.0]` per input,
/// listing the data entries in reverse order.
fn reversed_embeddings(request: &Request) -> ResponseTemplate {
    let body: Value = request.body_json().unwrap();
    let inputs = body["input"].as_array().unwrap();
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(i, text)| {
            let len = text.as_str().unwrap().chars().count() as f32;
            json!({ "object": "embedding", "index": i, "embedding": [len, i as f32, 1.0] })
        })
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({ "object": "list", "data": data }))
}

fn openai_config(server: &MockServer) -> OpenAIConfig {
    OpenAIConfig::new("sk-test").with_base_url(server.uri())
}

fn item(id: &str, vector: Vec<f32>) -> EmbeddedChunk {
    EmbeddedChunk {
        id: id.to_string(),
        vector,
        metadata: ChunkMetadata { content: format!("content of {id}") },
    }
}

#[tokio::test]
async fn embeddings_are_batched_and_returned_in_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "text-embedding-3-small" })))
        .respond_with(reversed_embeddings)
        .expect(3)
        .mount(&server)
        .await;

    let provider = OpenAIEmbeddingProvider::new(openai_config(&server))
        .unwrap()
        .with_dimensions(3)
        .with_batch_size(2)
        .with_max_concurrency(2);
    let texts = ["a", "bb", "ccc", "dddd", "eeeee"];

    let vectors = provider.embed_batch(&texts).await.unwrap();

    assert_eq!(vectors.len(), texts.len());
    for (text, vector) in texts.iter().zip(&vectors) {
        assert_eq!(vector[0], text.len() as f32);
        assert_eq!(vector.len(), provider.dimensions());
    }
}

#[tokio::test]
async fn embedding_inputs_are_validated_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(reversed_embeddings).expect(0).mount(&server).await;

    let provider = OpenAIEmbeddingProvider::new(openai_config(&server)).unwrap();

    assert!(matches!(provider.embed_batch(&[]).await, Err(RagError::EmptyInput(_))));
    assert!(matches!(provider.embed_batch(&["ok", ""]).await, Err(RagError::EmptyInput(_))));
    assert!(matches!(provider.embed("").await, Err(RagError::EmptyInput(_))));
}

#[tokio::test]
async fn rate_limits_are_reported_as_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "error": { "message": "Rate limit reached" } })),
        )
        .mount(&server)
        .await;

    let provider = OpenAIEmbeddingProvider::new(openai_config(&server)).unwrap();
    let err = provider.embed("hello").await.unwrap_err();

    assert!(matches!(&err, RagError::RateLimited { message, .. } if message.contains("Rate limit reached")));
    assert!(err.is_transient());
}

#[tokio::test]
async fn server_errors_and_timeouts_are_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let provider = OpenAIEmbeddingProvider::new(openai_config(&server)).unwrap();
    let err = provider.embed("hello").await.unwrap_err();
    assert!(matches!(&err, RagError::BackendUnavailable { message, .. } if message.contains("upstream exploded")));

    let model = OpenAIChatModel::new(openai_config(&server).with_timeout(Duration::from_millis(100)))
        .unwrap();
    let err = model.complete("hello").await.unwrap_err();
    assert!(matches!(err, RagError::BackendUnavailable { .. }));
}

#[tokio::test]
async fn chat_completion_returns_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [{ "role": "user", "content": "What do you love?" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Go" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let model = OpenAIChatModel::new(openai_config(&server)).unwrap();

    assert_eq!(model.complete("What do you love?").await.unwrap(), "Go");
    assert_eq!(model.name(), "gpt-4o-mini");
}

#[tokio::test]
async fn null_or_blank_content_is_an_empty_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "  \n" } }]
        })))
        .mount(&server)
        .await;

    let model = OpenAIChatModel::new(openai_config(&server)).unwrap();

    assert!(matches!(model.complete("q").await, Err(RagError::EmptyCompletion { .. })));
    assert!(matches!(model.complete("q").await, Err(RagError::EmptyCompletion { .. })));
}

#[tokio::test]
async fn pinecone_upserts_in_batches_with_headers_and_namespace() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(header("Api-Key", "pc-test"))
        .and(header("X-Pinecone-API-Version", "2024-07"))
        .and(body_partial_json(json!({ "namespace": "bio" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 100 })))
        .expect(3)
        .mount(&server)
        .await;

    let store = PineconeVectorStore::new(
        PineconeConfig::new("pc-test", server.uri()).with_namespace("bio"),
        2,
    )
    .unwrap();
    let items: Vec<EmbeddedChunk> =
        (0..250).map(|i| item(&format!("doc-{i}"), vec![i as f32, 1.0])).collect();

    store.upsert(&items).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let first: Value = requests[0].body_json().unwrap();
    assert_eq!(first["vectors"].as_array().unwrap().len(), 100);
    assert_eq!(first["vectors"][0]["id"], "doc-0");
    assert_eq!(first["vectors"][0]["metadata"]["content"], "content of doc-0");
    let last: Value = requests[2].body_json().unwrap();
    assert_eq!(last["vectors"].as_array().unwrap().len(), 50);
}

#[tokio::test]
async fn pinecone_query_results_are_sorted_and_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({
            "topK": 2,
            "includeMetadata": true,
            "includeValues": false,
            "namespace": ""
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                { "id": "doc-1", "score": 0.3, "metadata": { "content": "Bob loves Rust." } },
                { "id": "doc-0", "score": 0.9, "metadata": { "content": "Alice loves Go." } },
                { "id": "doc-2", "score": 0.5 }
            ],
            "namespace": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = PineconeVectorStore::new(PineconeConfig::new("pc-test", server.uri()), 2).unwrap();
    let result = store.query(&[0.1, 0.2], 2, true).await.unwrap();

    assert_eq!(result.ids(), vec!["doc-0", "doc-2"]);
    assert_eq!(result.matches()[0].content(), Some("Alice loves Go."));
    assert_eq!(result.matches()[1].metadata, None);
}

#[tokio::test]
async fn pinecone_rejects_wrong_dimensions_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let store = PineconeVectorStore::new(PineconeConfig::new("pc-test", server.uri()), 3).unwrap();

    let err = store.upsert(&[item("doc-0", vec![1.0, 2.0, 3.0]), item("doc-1", vec![1.0])]).await;
    assert!(matches!(err, Err(RagError::DimensionMismatch { expected: 3, actual: 1, .. })));

    let err = store.query(&[1.0; 4], 1, true).await;
    assert!(matches!(err, Err(RagError::DimensionMismatch { expected: 3, actual: 4, .. })));
}

#[tokio::test]
async fn pipeline_recovers_from_a_rate_limited_embedding_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(reversed_embeddings)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "I love Go." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = openai_config(&server);
    let pipeline = RagPipeline::builder()
        .config(RagConfig::builder().chunk_size(20).chunk_overlap(5).top_k(1).build().unwrap())
        .embedding_provider(Arc::new(
            OpenAIEmbeddingProvider::new(config.clone()).unwrap().with_dimensions(3),
        ))
        .vector_store(Arc::new(InMemoryVectorStore::with_dimensions(3)))
        .language_model(Arc::new(OpenAIChatModel::new(config).unwrap()))
        .prompt(PromptBuilder::new("Alice"))
        .retry_policy(RetryPolicy::default().with_initial_backoff(Duration::from_millis(5)))
        .build()
        .unwrap();

    let stored = pipeline.ingest(&Document::new("Alice loves Go. Bob loves Rust.")).await.unwrap();
    assert_eq!(stored.len(), 2);

    let outcome = pipeline.ask("What does Alice love?").await.unwrap();
    assert_eq!(outcome.answer.text, "I love Go.");
    assert_eq!(outcome.retrieval.len(), 1);

    let chat_request = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.url.path() == "/chat/completions")
        .unwrap();
    let body: Value = chat_request.body_json().unwrap();
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("You are an AI emulating Alice."));
    assert!(prompt.contains("QUESTION:\nWhat does Alice love?\n"));
}

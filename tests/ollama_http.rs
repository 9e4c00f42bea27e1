//! Wire-level tests for the Ollama client against a mock HTTP server.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use url::Url;

use ragmill::embeddings::{EmbedRole, EmbeddingOrchestrator, EmbeddingOutcome, EmbeddingProvider};
use ragmill::providers::{ChatTurn, CompletionProvider, OllamaClient};

fn client_for(server: &MockServer) -> OllamaClient {
    OllamaClient::new(
        reqwest::Client::new(),
        Url::parse(&server.base_url()).unwrap(),
        "nomic-embed-text",
        "llama3.1:8b",
    )
}

#[tokio::test]
async fn embeddings_request_carries_model_and_prompt() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/embeddings")
            .json_body(json!({
                "model": "nomic-embed-text",
                "prompt": "search_document: hello world",
            }));
        then.status(200)
            .json_body(json!({ "embedding": [0.25, -0.5, 1.0] }));
    });

    let client = client_for(&server);
    let vector = client.embed("search_document: hello world").await.unwrap();
    mock.assert();
    assert_eq!(vector, vec![0.25, -0.5, 1.0]);
}

#[tokio::test]
async fn backend_failure_degrades_to_unembedded() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/embeddings");
        then.status(500).body("model not loaded");
    });

    let orchestrator =
        EmbeddingOrchestrator::new(Arc::new(client_for(&server)), Duration::ZERO);
    let outcome = orchestrator.embed_one("some text", EmbedRole::Document).await;
    assert_eq!(outcome, EmbeddingOutcome::Unembedded);
}

#[tokio::test]
async fn missing_embedding_field_degrades_to_unembedded() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/embeddings");
        then.status(200).json_body(json!({}));
    });

    let orchestrator =
        EmbeddingOrchestrator::new(Arc::new(client_for(&server)), Duration::ZERO);
    let outcome = orchestrator.embed_one("some text", EmbedRole::Query).await;
    assert_eq!(outcome, EmbeddingOutcome::Unembedded);
}

#[tokio::test]
async fn chat_request_is_non_streaming_with_options() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .json_body(json!({
                "model": "llama3.1:8b",
                "messages": [{ "role": "user", "content": "Say hi" }],
                "stream": false,
                "options": { "temperature": 0.7, "num_ctx": 2000 },
            }));
        then.status(200).json_body(json!({
            "message": { "role": "assistant", "content": "Hi there." }
        }));
    });

    let client = client_for(&server);
    let reply = client
        .complete(&[ChatTurn::user("Say hi")], 0.7, 2000)
        .await
        .unwrap();
    mock.assert();
    assert_eq!(reply, "Hi there.");
}

#[tokio::test]
async fn chat_without_a_message_is_a_provider_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200).json_body(json!({}));
    });

    let client = client_for(&server);
    let err = client
        .complete(&[ChatTurn::user("Say hi")], 0.7, 2000)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no message"));
}

#[tokio::test]
async fn probe_reports_models_and_capability_checks() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(200).json_body(json!({
            "models": [
                { "name": "nomic-embed-text", "size": 274302450u64 },
                { "name": "llama3.1:8b", "size": 4661224676u64 },
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/embeddings");
        then.status(200).json_body(json!({ "embedding": [0.1, 0.2] }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200).json_body(json!({
            "message": { "role": "assistant", "content": "Hello" }
        }));
    });

    let report = client_for(&server).probe().await.unwrap();
    assert_eq!(report.models.len(), 2);
    assert_eq!(report.models[0].name, "nomic-embed-text");
    assert_eq!(report.embedding_dims, Some(2));
    assert_eq!(report.chat_reply.as_deref(), Some("Hello"));
}

#[tokio::test]
async fn probe_survives_partial_backend_failures() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(200).json_body(json!({ "models": [] }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/embeddings");
        then.status(500);
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(500);
    });

    let report = client_for(&server).probe().await.unwrap();
    assert!(report.models.is_empty());
    assert_eq!(report.embedding_dims, None);
    assert_eq!(report.chat_reply, None);
}

#[tokio::test]
async fn unreachable_backend_fails_the_probe() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(404);
    });

    assert!(client_for(&server).probe().await.is_err());
}

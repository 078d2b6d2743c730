use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atchat::credentials::StaticStore;
use atchat::error::RequestError;
use atchat::orchestrator::{RequestOrchestrator, NO_RESPONSE};

mod common;

fn answer(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] }
        }]
    })
}

#[tokio::test]
async fn test_successful_reply_extracts_first_text_part() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(common::generate_path()))
        .and(query_param("key", common::TEST_KEY))
        .and(body_json(json!({
            "contents": [{ "parts": [{ "text": "Hello there" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer("General Kenobi")))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = common::orchestrator(&server.uri());
    let reply = orchestrator.send("Hello there").await;

    assert!(reply.is_success());
    assert_eq!(reply.content, "General Kenobi");
}

#[tokio::test]
async fn test_endpoint_error_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(common::generate_path()))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "quota exceeded" }
        })))
        .mount(&server)
        .await;

    let orchestrator = common::orchestrator(&server.uri());
    let reply = orchestrator.send("hi").await;

    assert_eq!(
        reply.failure,
        Some(RequestError::Endpoint("quota exceeded".to_string()))
    );
    assert_eq!(reply.content, "[Endpoint Error] quota exceeded");
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(common::generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let orchestrator = common::orchestrator(&server.uri());
    let reply = orchestrator.send("hi").await;

    assert!(matches!(
        reply.failure,
        Some(RequestError::MalformedResponse(_))
    ));
    assert!(reply.content.starts_with("[Error parsing response]"));
}

#[tokio::test]
async fn test_no_candidates_yields_placeholder() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(common::generate_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let orchestrator = common::orchestrator(&server.uri());
    let reply = orchestrator.send("hi").await;

    assert!(reply.is_success());
    assert_eq!(reply.content, NO_RESPONSE);
}

#[tokio::test]
async fn test_missing_credential_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let orchestrator = RequestOrchestrator::new(
        &common::endpoint(&server.uri(), 5),
        Arc::new(StaticStore::empty()),
        "geminiApiKey",
    )
    .unwrap();
    let reply = orchestrator.send("hi").await;

    assert!(reply.is_missing_credential());
    assert_eq!(reply.content, "[API key not set]");
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(common::generate_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(answer("too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let orchestrator = RequestOrchestrator::new(
        &common::endpoint(&server.uri(), 1),
        Arc::new(StaticStore::with_secret("geminiApiKey", common::TEST_KEY)),
        "geminiApiKey",
    )
    .unwrap();
    let reply = orchestrator.send("hi").await;

    assert_eq!(
        reply.failure,
        Some(RequestError::Timeout(Duration::from_secs(1)))
    );
    assert_eq!(reply.content, "[Request timed out after 1s]");
}

#[tokio::test]
async fn test_transport_error_does_not_leak_key() {
    // nothing listens on the discard port
    let orchestrator = common::orchestrator("http://127.0.0.1:9");
    let reply = orchestrator.send("hi").await;

    assert!(matches!(reply.failure, Some(RequestError::Transport(_))));
    assert!(reply.content.starts_with("[Request Error]"));
    assert!(!reply.content.contains(common::TEST_KEY));
}

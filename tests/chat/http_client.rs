use std::time::Duration;

use charachat::chat::{ChatClient, ChatTurn, CompletionRequest, OpenAiCompatibleClient};
use charachat::config::ApiConfig;
use charachat::error::ChatError;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "sk-live-abcdef1234567890";

fn client_for(server: &MockServer, timeout_secs: u64) -> OpenAiCompatibleClient {
    OpenAiCompatibleClient::new(&ApiConfig {
        base_url: format!("{}/v1", server.uri()),
        api_key: Some(API_KEY.into()),
        model: "test-model".into(),
        timeout_secs,
        ..ApiConfig::default()
    })
    .unwrap()
}

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "test-model".into(),
        messages: vec![ChatTurn::system("你是小雪。"), ChatTurn::user("在吗")],
        temperature: 0.8,
        max_tokens: 256,
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn returns_first_choice_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", format!("Bearer {API_KEY}").as_str()))
        .and(body_partial_json(json!({
            "model": "test-model",
            "messages": [
                { "role": "system", "content": "你是小雪。" },
                { "role": "user", "content": "在吗" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("在呀，怎么啦？")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server, 30)
        .complete(&request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(reply, "在呀，怎么啦？");
}

#[tokio::test]
async fn api_errors_keep_status_and_hide_the_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": format!("Incorrect API key provided: {API_KEY}") }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server, 30)
        .complete(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    match &err {
        ChatError::Api { status, message } => {
            assert_eq!(*status, 401);
            assert!(message.contains("Incorrect API key"), "{message}");
        }
        other => panic!("expected an API error, got {other:?}"),
    }
    assert!(!err.to_string().contains(API_KEY));
}

#[tokio::test]
async fn blank_completion_is_an_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("   ")))
        .mount(&server)
        .await;

    let err = client_for(&server, 30)
        .complete(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::EmptyResponse));
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("太慢了"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = client_for(&server, 1)
        .complete(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Timeout { secs: 1 }), "{err:?}");
}

#[tokio::test]
async fn cancelling_the_token_aborts_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("不会到的"))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, 30);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = client.complete(&request(), &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn missing_key_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("?")))
        .expect(0)
        .mount(&server)
        .await;

    let client = OpenAiCompatibleClient::new(&ApiConfig {
        base_url: server.uri(),
        api_key: None,
        ..ApiConfig::default()
    })
    .unwrap();
    let err = client
        .complete(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::MissingApiKey));
}

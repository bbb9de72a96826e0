//! Integration tests that run the full application on a random port.

mod common;

use common::{test_config, TEST_TOKEN};
use prompt_service::config::PromptConfig;
use prompt_service::services::metrics::init_metrics;
use prompt_service::Application;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Spawn the application on a random port and return the port number.
async fn spawn_app(mut config: PromptConfig) -> u16 {
    config.common.port = 0;

    let app = Application::build(config)
        .await
        .expect("Failed to build application");
    let port = app.port();

    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    port
}

#[tokio::test]
async fn health_check_returns_ok() {
    let port = spawn_app(test_config("http://127.0.0.1:9", "http://127.0.0.1:9")).await;

    let response = Client::new()
        .get(format!("http://127.0.0.1:{}/health", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "prompt-service");
}

#[tokio::test]
async fn readiness_reflects_missing_credentials() {
    let ready_port = spawn_app(test_config("http://127.0.0.1:9", "http://127.0.0.1:9")).await;

    let mut config = test_config("http://127.0.0.1:9", "http://127.0.0.1:9");
    config.gemini.api_key = None;
    let not_ready_port = spawn_app(config).await;

    let client = Client::new();

    let response = client
        .get(format!("http://127.0.0.1:{}/ready", ready_port))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .get(format!("http://127.0.0.1:{}/ready", not_ready_port))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["missing"], json!(["GEMINI_API_KEY"]));
}

#[tokio::test]
async fn relays_prompt_over_the_network() {
    let identity = MockServer::start().await;
    let gemini = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "u1" })))
        .expect(1)
        .mount(&identity)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hi there" }] } }]
        })))
        .expect(1)
        .mount(&gemini)
        .await;

    let port = spawn_app(test_config(&identity.uri(), &gemini.uri())).await;

    let response = Client::new()
        .post(format!("http://127.0.0.1:{}/", port))
        .bearer_auth(TEST_TOKEN)
        .json(&json!({ "prompt": "Hello" }))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "text": "Hi there" }));
}

#[tokio::test]
async fn metrics_endpoint_reports_served_requests() {
    // The only test in this binary that installs the global recorder.
    init_metrics().expect("Failed to install metrics recorder");
    let port = spawn_app(test_config("http://127.0.0.1:9", "http://127.0.0.1:9")).await;
    let client = Client::new();

    let response = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .get(format!("http://127.0.0.1:{}/metrics", port))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body = response.text().await.unwrap();
    let health_line = body
        .lines()
        .find(|line| line.starts_with("http_requests_total{") && line.contains(r#"path="/health""#));
    assert!(health_line.is_some(), "metrics output:\n{}", body);
}

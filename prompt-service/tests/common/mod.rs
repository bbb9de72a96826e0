//! Test helpers: a router wired to wiremock stand-ins for Supabase Auth and
//! the Gemini API.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use prompt_service::config::{Environment, GeminiSettings, IdentityConfig, PromptConfig};
use prompt_service::startup::{build_router, AppState};
use secrecy::Secret;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TOKEN: &str = "test-jwt";
pub const TEST_ANON_KEY: &str = "test-anon-key";
pub const TEST_GEMINI_KEY: &str = "test-gemini-key";
pub const TEST_MODEL: &str = "gemini-2.5-flash";

pub struct TestApp {
    pub router: Router,
    pub identity: MockServer,
    pub gemini: MockServer,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body is not JSON")
    }
}

pub fn test_config(identity_uri: &str, gemini_uri: &str) -> PromptConfig {
    PromptConfig {
        common: Default::default(),
        environment: Environment::Dev,
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        identity: Some(IdentityConfig {
            base_url: identity_uri.to_string(),
            anon_key: Secret::new(TEST_ANON_KEY.to_string()),
        }),
        gemini: GeminiSettings {
            api_key: Some(Secret::new(TEST_GEMINI_KEY.to_string())),
            model: TEST_MODEL.to_string(),
            api_base: gemini_uri.to_string(),
        },
    }
}

impl TestApp {
    /// Fully configured app.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// App whose configuration is adjusted by `customize` before the router
    /// is built.
    pub async fn spawn_with<F: FnOnce(&mut PromptConfig)>(customize: F) -> Self {
        let identity = MockServer::start().await;
        let gemini = MockServer::start().await;

        let mut config = test_config(&identity.uri(), &gemini.uri());
        customize(&mut config);

        let state = AppState::new(config, reqwest::Client::new());

        Self {
            router: build_router(state),
            identity,
            gemini,
        }
    }

    /// Accept `TEST_TOKEN` with the expected headers, `times` times.
    pub async fn accept_token(&self, times: u64) {
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
            .and(header("apikey", TEST_ANON_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user-123" })))
            .expect(times)
            .mount(&self.identity)
            .await;
    }

    pub async fn reject_token(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({ "msg": "invalid JWT" })),
            )
            .expect(1)
            .mount(&self.identity)
            .await;
    }

    pub async fn expect_no_identity_calls(&self) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&self.identity)
            .await;
    }

    /// Answer generateContent calls with `template`, `times` times.
    pub async fn gemini_responds(&self, template: ResponseTemplate, times: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/models/{}:generateContent", TEST_MODEL)))
            .and(query_param("key", TEST_GEMINI_KEY))
            .respond_with(template)
            .expect(times)
            .mount(&self.gemini)
            .await;
    }

    pub async fn expect_no_gemini_calls(&self) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&self.gemini)
            .await;
    }

    pub async fn request(
        &self,
        method: Method,
        authorization: Option<&str>,
        body: impl Into<Body>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri("/")
            .header("content-type", "application/json");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body.into()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    /// POST `body` with a valid bearer token.
    pub async fn post_prompt(&self, body: Value) -> TestResponse {
        self.request(
            Method::POST,
            Some(&format!("Bearer {}", TEST_TOKEN)),
            body.to_string(),
        )
        .await
    }
}

pub fn gemini_text(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    }))
}

pub fn assert_cors(response: &TestResponse) {
    assert_eq!(
        response
            .headers
            .get("access-control-allow-origin")
            .expect("missing Access-Control-Allow-Origin"),
        "*"
    );
    assert_eq!(
        response.headers.get("access-control-allow-headers").unwrap(),
        "authorization, x-client-info, apikey, content-type"
    );
}

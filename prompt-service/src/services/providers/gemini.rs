//! Gemini AI provider implementation.
//!
//! Implements single-shot text generation against the `generateContent`
//! method of Google's Gemini API.

use super::{ProviderError, ProviderResponse, TextProvider};
use crate::services::metrics;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use serde_json::Value;
use service_core::observability::TracedRequestExt;
use std::time::Instant;

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Secret<String>,
    pub model: String,
    /// Versioned API root, e.g. `https://generativelanguage.googleapis.com/v1`.
    pub api_base: String,
}

/// Gemini text provider.
pub struct GeminiTextProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiTextProvider {
    pub fn new(config: GeminiConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Build the API URL for the given model and method. The key travels as a
    /// query parameter and is added by the caller.
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.api_base, self.config.model, method
        )
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        request_id: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending request to Gemini API"
        );

        let started = Instant::now();
        let result = self
            .client
            .post(self.api_url("generateContent"))
            .query(&[("key", self.config.api_key.expose_secret().as_str())])
            .json(&request)
            .traced(request_id)
            .send()
            .await;
        metrics::record_upstream_latency("gemini", started.elapsed());

        // The request URL carries the API key; strip it from the error.
        let response = result.map_err(|e| ProviderError::NetworkError(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| ProviderError::NetworkError(e.without_url().to_string()))?;
            tracing::warn!(
                model = %self.config.model,
                status = status.as_u16(),
                "Gemini API returned an error"
            );
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.without_url().to_string()))?;

        Ok(provider_response(&body))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// Gemini API Request Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Pull the first part of the first candidate out of a success body.
///
/// Any JSON is accepted: a missing or mistyped step anywhere along
/// `candidates[0].content.parts[0].text` yields no text rather than an error.
fn provider_response(body: &Value) -> ProviderResponse {
    let text = body
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string);

    let token_count = |pointer: &str| {
        body.pointer(pointer)
            .and_then(Value::as_i64)
            .and_then(|n| i32::try_from(n).ok())
            .unwrap_or(0)
    };

    ProviderResponse {
        text,
        input_tokens: token_count("/usageMetadata/promptTokenCount"),
        output_tokens: token_count("/usageMetadata/candidatesTokenCount"),
    }
}

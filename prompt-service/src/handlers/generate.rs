//! Prompt relay endpoint.
//!
//! The request runs through a fixed sequence of steps. Each step either yields
//! the value the next one needs or stops the request with an `AppError`:
//!
//! 1. bearer token from `Authorization`
//! 2. identity provider configured
//! 3. token accepted by the identity provider
//! 4. non-empty string `prompt` in the JSON body, read only once the caller
//!    is authenticated
//! 5. generation provider configured
//! 6. generation call
//!
//! CORS preflights are answered by middleware and never get here.

use crate::services::metrics;
use crate::services::{AuthResult, IdentityVerifier, ProviderResponse};
use crate::startup::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::AppError;
use service_core::middleware::tracing::RequestId;

pub const MISSING_AUTHORIZATION: &str = "Missing Authorization header";
pub const INVALID_JWT: &str = "Invalid JWT";
pub const PROMPT_REQUIRED: &str = "Prompt is required";

/// Returned as `text` when the upstream succeeded but carried no text part.
pub const FALLBACK_TEXT: &str = "No response from generation service.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
}

/// Takes the raw request so that no body extractor (and its size limit) runs
/// ahead of the authentication steps.
pub async fn generate(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<GenerateResponse>, AppError> {
    let (parts, body) = request.into_parts();
    let request_id = parts.extensions.get::<RequestId>().map(RequestId::as_str);

    let result = relay(&state, &parts.headers, body, request_id).await;
    metrics::record_outcome(outcome_label(&result));

    result.map(Json)
}

async fn relay(
    state: &AppState,
    headers: &HeaderMap,
    body: Body,
    request_id: Option<&str>,
) -> Result<GenerateResponse, AppError> {
    let token = bearer_token(headers)?;

    let identity = state.identity()?;
    let user_id = authenticate(identity.as_ref(), &token, request_id).await?;

    let body = read_body(body).await?;
    let prompt = parse_prompt(&body)?;

    let provider = state.text_provider()?;
    let response = provider.generate(&prompt, request_id).await?;

    tracing::info!(
        user_id = user_id.as_deref().unwrap_or("-"),
        model = %provider.model(),
        prompt_len = prompt.len(),
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "Prompt relayed"
    );

    Ok(GenerateResponse {
        text: response_text(response),
    })
}

/// Token from the `Authorization` header, with the first `"Bearer "` removed.
/// An empty or non-ASCII header counts as missing.
fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Unauthorized(MISSING_AUTHORIZATION.to_string()))?;

    Ok(value.replacen("Bearer ", "", 1))
}

async fn authenticate(
    identity: &dyn IdentityVerifier,
    token: &str,
    request_id: Option<&str>,
) -> Result<Option<String>, AppError> {
    match identity.verify(token, request_id).await? {
        AuthResult::Valid { user_id } => Ok(user_id),
        AuthResult::Invalid { .. } => Err(AppError::Unauthorized(INVALID_JWT.to_string())),
    }
}

/// Buffers the whole body. No size limit is applied.
async fn read_body(body: Body) -> Result<Bytes, AppError> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to read request body: {}", e)))
}

/// A body that is not JSON at all, or is JSON `null`, is an internal error;
/// any other JSON without a usable `prompt` is a bad request.
fn parse_prompt(body: &[u8]) -> Result<String, AppError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Invalid JSON body: {}", e)))?;

    if value.is_null() {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "Request body is null"
        )));
    }

    match value.get("prompt") {
        Some(Value::String(prompt)) if !prompt.is_empty() => Ok(prompt.clone()),
        _ => Err(AppError::BadRequest(PROMPT_REQUIRED.to_string())),
    }
}

fn response_text(response: ProviderResponse) -> String {
    response.text.unwrap_or_else(|| {
        tracing::warn!("Generation response carried no text, returning fallback");
        FALLBACK_TEXT.to_string()
    })
}

fn outcome_label(result: &Result<GenerateResponse, AppError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AppError::Unauthorized(_)) => "unauthorized",
        Err(AppError::BadRequest(_)) => "bad_request",
        Err(AppError::ConfigError(_)) => "config_error",
        Err(AppError::Upstream { .. }) => "upstream_error",
        Err(_) => "internal_error",
    }
}

//! Text generation provider abstraction.
//!
//! The handler only sees the `TextProvider` trait, so the Gemini backend can
//! be pointed at a local mock or replaced without touching request handling.

pub mod gemini;

use async_trait::async_trait;
use service_core::error::AppError;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The upstream answered with a non-success status. `body` is the raw
    /// response text, relayed to the caller as-is.
    #[error("Gemini API error {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Failed to parse Gemini response: {0}")]
    InvalidResponse(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::ApiError { body, .. } => AppError::Upstream {
                message: "Gemini API error".to_string(),
                details: body,
            },
            other => AppError::InternalError(anyhow::Error::new(other)),
        }
    }
}

/// Result of a successful generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderResponse {
    /// Text of the first part of the first candidate, when the upstream
    /// returned one.
    pub text: Option<String>,

    pub input_tokens: i32,

    pub output_tokens: i32,
}

/// Trait for text generation providers (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate a single, non-streamed response for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        request_id: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Model identifier, for logs and metrics.
    fn model(&self) -> &str;
}

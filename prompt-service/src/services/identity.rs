//! Caller authentication against the Supabase Auth "current user" endpoint.

use crate::config::IdentityConfig;
use crate::services::metrics;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use service_core::error::AppError;
use service_core::observability::TracedRequestExt;
use std::time::Instant;
use thiserror::Error;

/// Outcome of a token check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Valid { user_id: Option<String> },
    Invalid { status: u16 },
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Identity provider request failed: {0}")]
    NetworkError(String),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Ask the identity provider whether `token` belongs to a signed-in user.
    ///
    /// A rejection is `Ok(AuthResult::Invalid)`; `Err` is reserved for the
    /// provider being unreachable.
    async fn verify(
        &self,
        token: &str,
        request_id: Option<&str>,
    ) -> Result<AuthResult, IdentityError>;
}

#[derive(Clone)]
pub struct SupabaseAuthClient {
    client: Client,
    config: IdentityConfig,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: Option<String>,
}

impl SupabaseAuthClient {
    pub fn new(config: IdentityConfig, client: Client) -> Self {
        Self { client, config }
    }

    fn user_url(&self) -> String {
        format!("{}/auth/v1/user", self.config.base_url)
    }
}

#[async_trait]
impl IdentityVerifier for SupabaseAuthClient {
    async fn verify(
        &self,
        token: &str,
        request_id: Option<&str>,
    ) -> Result<AuthResult, IdentityError> {
        let started = Instant::now();
        let result = self
            .client
            .get(self.user_url())
            .bearer_auth(token)
            .header("apikey", self.config.anon_key.expose_secret().as_str())
            .traced(request_id)
            .send()
            .await;
        metrics::record_upstream_latency("identity", started.elapsed());

        let response = result.map_err(|e| IdentityError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Identity provider rejected token");
            return Ok(AuthResult::Invalid {
                status: status.as_u16(),
            });
        }

        // The user payload is only used for log correlation.
        let user_id = response
            .json::<SupabaseUser>()
            .await
            .ok()
            .and_then(|user| user.id);

        Ok(AuthResult::Valid { user_id })
    }
}

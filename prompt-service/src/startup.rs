//! Application startup and lifecycle management.
//!
//! Configuration is read once, here, and the resulting clients are shared by
//! every request through `AppState`.

use crate::config::PromptConfig;
use crate::handlers;
use crate::services::{
    GeminiConfig, GeminiTextProvider, IdentityVerifier, SupabaseAuthClient, TextProvider,
};
use anyhow::Context;
use axum::{
    middleware::from_fn,
    routing::{any, get},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    cors::cors_middleware, metrics::metrics_middleware, tracing::request_id_middleware,
    tracing::REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PromptConfig>,
    /// `None` when the identity provider is not configured.
    pub identity: Option<Arc<dyn IdentityVerifier>>,
    /// `None` when no Gemini API key is configured.
    pub text_provider: Option<Arc<dyn TextProvider>>,
}

impl AppState {
    /// Build the upstream clients the configuration allows.
    pub fn new(config: PromptConfig, client: reqwest::Client) -> Self {
        let identity = config.identity.clone().map(|identity| {
            tracing::info!(base_url = %identity.base_url, "Initialized identity provider client");
            Arc::new(SupabaseAuthClient::new(identity, client.clone())) as Arc<dyn IdentityVerifier>
        });

        let text_provider = config.gemini.api_key.clone().map(|api_key| {
            tracing::info!(model = %config.gemini.model, "Initialized Gemini text provider");
            Arc::new(GeminiTextProvider::new(
                GeminiConfig {
                    api_key,
                    model: config.gemini.model.clone(),
                    api_base: config.gemini.api_base.clone(),
                },
                client.clone(),
            )) as Arc<dyn TextProvider>
        });

        for missing in config.missing_credentials() {
            tracing::warn!(
                setting = missing,
                "Credential not configured, requests that need it will fail"
            );
        }

        Self {
            config: Arc::new(config),
            identity,
            text_provider,
        }
    }

    pub fn identity(&self) -> Result<&Arc<dyn IdentityVerifier>, AppError> {
        self.identity
            .as_ref()
            .ok_or_else(|| AppError::ConfigError("Missing Supabase configuration".to_string()))
    }

    pub fn text_provider(&self) -> Result<&Arc<dyn TextProvider>, AppError> {
        self.text_provider
            .as_ref()
            .ok_or_else(|| AppError::ConfigError("GEMINI_API_KEY not set".to_string()))
    }
}

/// HTTP client shared by both upstream clients. No request timeout is set.
pub fn http_client() -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .user_agent(concat!("prompt-service/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
        .map_err(AppError::from)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(handlers::generate))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .layer(from_fn(cors_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri().path(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: PromptConfig) -> Result<Self, AppError> {
        let state = AppState::new(config, http_client()?);

        // Port 0 binds a random port, for tests.
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "Prompt service listening");

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

pub const SERVICE_NAME: &str = "prompt-service";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1";

#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    /// `None` when `SUPABASE_URL` or `SUPABASE_ANON_KEY` is unset.
    pub identity: Option<IdentityConfig>,
    pub gemini: GeminiSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Project URL, without the `/auth/v1` suffix.
    pub base_url: String,
    /// Public (anon) key sent as the `apikey` header.
    pub anon_key: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
}

impl PromptConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match get("ENVIRONMENT").as_deref() {
            Some("prod") => Environment::Prod,
            _ => Environment::Dev,
        };

        let identity = match (get("SUPABASE_URL"), get("SUPABASE_ANON_KEY")) {
            (Some(url), Some(key)) => Some(IdentityConfig {
                base_url: url.trim_end_matches('/').to_string(),
                anon_key: Secret::new(key),
            }),
            _ => None,
        };

        let gemini = GeminiSettings {
            api_key: get("GEMINI_API_KEY").map(Secret::new),
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            api_base: get("GEMINI_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
        };

        let config = PromptConfig {
            common,
            environment,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            otlp_endpoint: get("OTLP_ENDPOINT"),
            identity,
            gemini,
        };

        let missing = config.missing_credentials();
        if config.environment == Environment::Prod && !missing.is_empty() {
            return Err(AppError::ConfigError(format!(
                "{} required in production but not set",
                missing.join(", ")
            )));
        }

        Ok(config)
    }

    /// Names of the credentials that are not configured.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.identity.is_none() {
            missing.push("SUPABASE_URL/SUPABASE_ANON_KEY");
        }
        if self.gemini.api_key.is_none() {
            missing.push("GEMINI_API_KEY");
        }
        missing
    }
}

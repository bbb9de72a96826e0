pub mod identity;
pub mod metrics;
pub mod providers;

pub use identity::{AuthResult, IdentityError, IdentityVerifier, SupabaseAuthClient};
pub use providers::gemini::{GeminiConfig, GeminiTextProvider};
pub use providers::{ProviderError, ProviderResponse, TextProvider};

//! Authenticated prompt relay: verifies the caller with Supabase Auth, then
//! forwards the prompt to Gemini and returns the generated text.

pub mod config;
pub mod handlers;
pub mod services;
pub mod startup;

pub use startup::{build_router, AppState, Application};

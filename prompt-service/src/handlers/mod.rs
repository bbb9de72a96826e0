//! HTTP handlers for the prompt service.

pub mod generate;
pub mod health;
pub mod metrics;

pub use generate::generate;
pub use health::{health_check, readiness_check};
pub use metrics::metrics;

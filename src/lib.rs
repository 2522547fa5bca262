//! # Model Endpoint
//!
//! An HTTP service that hosts live machine-learning model instances in
//! memory and lets authenticated clients invoke the operations each model
//! kind publishes.
//!
//! - [`models`]: model records, the kind registry and capability dispatch
//! - [`auth`]: bearer-token issuance and validation, with optional
//!   delegation to an external identity provider
//! - [`server`]: axum routes and the error-to-status translation
//! - [`config`]: environment driven configuration

pub mod auth;
pub mod config;
pub mod models;
pub mod server;

pub use auth::{AuthError, AuthGateway, UserIdentity};
pub use config::{AppConfig, AuthConfig, ConfigError};
pub use models::{dispatch, ModelError, ModelRegistry};
pub use server::{app_router, AppState};

/// Crate version, reported by the status route.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name reported by the status route.
pub const SERVICE_NAME: &str = "Model endpoint";

/// Versioned route prefix, e.g. `/api/v0`.
pub fn api_prefix() -> String {
    format!("/api/v{}", env!("CARGO_PKG_VERSION_MAJOR"))
}

//! HTTP server exposing the model registry and the auth gateway.
//!
//! # Endpoints
//!
//! - `/api/v{major}/status/`: Liveness probe
//! - `/api/v{major}/auth/*`: Token issuance and refresh
//! - `/api/v{major}/models/*`: Model registry and capability dispatch (bearer protected)

pub mod error;
pub mod extract;
pub mod routes;

pub use error::ApiError;
pub use extract::{AuthenticatedUser, BearerToken};
pub use routes::{app_router, AppState};

//! Translation of domain errors into HTTP responses.
//!
//! Every handler returns `ApiError` on failure; this is the only place
//! status codes are chosen. Bodies are `{"error": <code>, "detail": <text>}`.

use axum::extract::rejection::JsonRejection;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::models::{CapabilityError, ModelError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The request body could not be parsed into the expected shape.
    #[error("Malformed request body: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

const INTERNAL_DETAIL: &str = "Internal server error";

impl ApiError {
    /// Status, machine-readable code and client-facing detail.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Model(err) => match err {
                ModelError::NotFound(_) => (
                    StatusCode::NOT_FOUND,
                    "model_not_found",
                    "Model not found".to_string(),
                ),
                ModelError::CapabilityNotFound { .. } => (
                    StatusCode::NOT_FOUND,
                    "capability_not_found",
                    "Function not implemented".to_string(),
                ),
                ModelError::UnknownKind(_) => (
                    StatusCode::NOT_FOUND,
                    "model_not_implemented",
                    "Model not implemented".to_string(),
                ),
                ModelError::NoChange(_) => (
                    StatusCode::NOT_FOUND,
                    "nothing_to_update",
                    "Model or parameter not implemented".to_string(),
                ),
                ModelError::InvalidSpecification(msg) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_specification",
                    msg.clone(),
                ),
                ModelError::Capability(CapabilityError::InvalidArguments(msg)) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_arguments",
                    msg.clone(),
                ),
                ModelError::Capability(CapabilityError::NotReady(msg)) => (
                    StatusCode::CONFLICT,
                    "capability_not_ready",
                    msg.clone(),
                ),
                ModelError::Capability(CapabilityError::Execution(_)) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    INTERNAL_DETAIL.to_string(),
                ),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidToken => (
                    StatusCode::UNAUTHORIZED,
                    "invalid_token",
                    "Could not validate credentials".to_string(),
                ),
                AuthError::Unauthorized => (
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    "Incorrect credentials".to_string(),
                ),
                AuthError::Signing(_) | AuthError::Config(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    INTERNAL_DETAIL.to_string(),
                ),
            },
            Self::BadRequest(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_body",
                msg.clone(),
            ),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                INTERNAL_DETAIL.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, detail) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = Json(serde_json::json!({ "error": code, "detail": detail }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

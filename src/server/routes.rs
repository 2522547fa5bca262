//! Axum route handlers.
//!
//! # Routes (all under `/api/v{major}`)
//!
//! - `GET    /status/`: liveness probe (public)
//! - `POST   /auth/login`: issue a token (public; path configurable)
//! - `POST   /auth/refresh`: re-issue a token for a valid bearer token
//! - `GET    /models/`: list created model ids
//! - `POST   /models/`: create a model
//! - `GET    /models/implemented`: list supported model kinds
//! - `GET    /models/:id`: list a model's capabilities
//! - `POST   /models/:id`: invoke a capability
//! - `PATCH  /models/:id`: update a model
//! - `DELETE /models/:id`: delete a model
//!
//! Every `/models` route requires `Authorization: Bearer <token>`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::extract::{AuthenticatedUser, BearerToken};
use crate::auth::{AccessToken, AuthError, AuthGateway, LoginRequest};
use crate::config::AppConfig;
use crate::models::{dispatch, GenericRequest, GenericResponse, ModelError, ModelRegistry};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Live model records.
    pub registry: Arc<ModelRegistry>,
    /// Token issuance and validation.
    pub auth: Arc<AuthGateway>,
    /// Route on which tokens are issued.
    pub token_route: String,
}

impl AppState {
    pub fn new(registry: ModelRegistry, auth: AuthGateway) -> Self {
        Self {
            registry: Arc::new(registry),
            auth: Arc::new(auth),
            token_route: format!("{}/auth/login", crate::api_prefix()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AuthError> {
        let auth = AuthGateway::from_config(&config.auth)?;
        Ok(Self::new(ModelRegistry::default(), auth).with_token_route(&config.auth.token_route))
    }

    pub fn with_token_route(mut self, route: &str) -> Self {
        self.token_route = route.to_string();
        self
    }
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCreationRequest {
    pub model_type: String,
    pub model_specification: GenericRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFunctionRequest {
    pub function_call: String,
    pub input_data: GenericRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUpdateRequest {
    pub model_specification: GenericRequest,
}

#[derive(Debug, Serialize)]
pub struct ModelListResponse {
    pub models: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FunctionCallsResponse {
    #[serde(rename = "functionCalls")]
    pub function_calls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelIdResponse {
    #[serde(rename = "modelID")]
    pub model_id: String,
}

#[derive(Debug, Serialize)]
pub struct FunctionOutputResponse {
    #[serde(rename = "outputData")]
    pub output_data: GenericResponse,
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    let prefix = crate::api_prefix();
    let token_route = state.token_route.clone();

    Router::new()
        .route(&format!("{}/status/", prefix), get(status_handler))
        .route(&token_route, post(login_handler))
        .route(&format!("{}/auth/refresh", prefix), post(refresh_handler))
        .route(
            &format!("{}/models/", prefix),
            get(list_models_handler).post(create_model_handler),
        )
        .route(
            &format!("{}/models/implemented", prefix),
            get(list_kinds_handler),
        )
        .route(
            &format!("{}/models/:id", prefix),
            get(list_capabilities_handler)
                .post(invoke_capability_handler)
                .patch(update_model_handler)
                .delete(delete_model_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /status/: liveness probe.
async fn status_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": format!("{} online at version {}.", crate::SERVICE_NAME, crate::VERSION),
    }))
}

// ---------------------------------------------------------------------------
// Auth handlers
// ---------------------------------------------------------------------------

/// POST /auth/login: local rule first, then the identity provider.
async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AccessToken>, ApiError> {
    let Json(credentials) = payload.map_err(|_| ApiError::Auth(AuthError::Unauthorized))?;
    let token = state.auth.login(&credentials).await?;
    Ok(Json(token))
}

/// POST /auth/refresh: validate the bearer token and re-issue it.
async fn refresh_handler(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<AccessToken>, ApiError> {
    Ok(Json(state.auth.refresh(&token)?))
}

// ---------------------------------------------------------------------------
// Model handlers
// ---------------------------------------------------------------------------

/// GET /models/: ids of all created models.
async fn list_models_handler(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Json<ModelListResponse> {
    Json(ModelListResponse {
        models: state.registry.list(),
    })
}

/// GET /models/implemented: supported model kinds.
async fn list_kinds_handler(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Json<ModelListResponse> {
    Json(ModelListResponse {
        models: state.registry.implemented_kinds(),
    })
}

/// POST /models/: create a model of `modelType` from `modelSpecification`.
async fn create_model_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    payload: Result<Json<ModelCreationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let summary = state
        .registry
        .create(&request.model_type, request.model_specification)?;
    tracing::debug!(model_id = %summary.id, email = %user.email, "Model created on request");

    let location = format!("{}/models/{}", crate::api_prefix(), summary.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ModelIdResponse {
            model_id: summary.id,
        }),
    ))
}

/// GET /models/:id: capability names of a model.
async fn list_capabilities_handler(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<FunctionCallsResponse>, ApiError> {
    let handle = state
        .registry
        .get(&id)
        .ok_or_else(|| ModelError::NotFound(id.clone()))?;
    let function_calls = handle.read().capability_names();
    Ok(Json(FunctionCallsResponse { function_calls }))
}

/// POST /models/:id: run `functionCall` with `inputData` as named arguments.
///
/// Capabilities may be CPU heavy (training), so they run on the blocking pool.
async fn invoke_capability_handler(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    payload: Result<Json<ModelFunctionRequest>, JsonRejection>,
) -> Result<Json<FunctionOutputResponse>, ApiError> {
    let Json(request) = payload?;
    let registry = Arc::clone(&state.registry);
    let output_data = tokio::task::spawn_blocking(move || {
        dispatch(&registry, &id, &request.function_call, &request.input_data)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("capability task failed: {}", e)))??;
    Ok(Json(FunctionOutputResponse { output_data }))
}

/// PATCH /models/:id: hand `modelSpecification` to the model's update.
async fn update_model_handler(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    payload: Result<Json<ModelUpdateRequest>, JsonRejection>,
) -> Result<Json<ModelIdResponse>, ApiError> {
    let Json(request) = payload?;
    let registry = Arc::clone(&state.registry);
    let model_id = id.clone();
    tokio::task::spawn_blocking(move || registry.update(&model_id, &request.model_specification))
        .await
        .map_err(|e| ApiError::Internal(format!("update task failed: {}", e)))??;
    Ok(Json(ModelIdResponse { model_id: id }))
}

/// DELETE /models/:id: remove a model.
async fn delete_model_handler(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<ModelIdResponse>, ApiError> {
    state.registry.delete(&id)?;
    Ok(Json(ModelIdResponse { model_id: id }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

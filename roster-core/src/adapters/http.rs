//! HTTP adapter - `POST /api/register` over axum
//!
//! The handler only translates: JSON in, one pipeline run, status code and
//! `{"ok", "message"}` body out. CORS, request tracing and the request
//! timeout are tower layers around the router; a timed-out request still
//! answers with the same body shape.

use std::sync::Arc;

use axum::error_handling::HandleErrorLayer;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::routing::{get, post};
use axum::{BoxError, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::timeout::error::Elapsed;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerSettings;
use crate::domain::result::{Result, INTERNAL_MESSAGE};
use crate::domain::{OutcomeKind, RegistrationInput, RegistrationOutcome};
use crate::services::RegistrationService;

pub const INVALID_JSON_MESSAGE: &str = "invalid json";
pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "method not allowed";
pub const TIMEOUT_MESSAGE: &str = "request timeout";

/// Response body for every API endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    pub message: String,
}

impl ApiResponse {
    fn new(ok: bool, message: impl Into<String>) -> Self {
        Self {
            ok,
            message: message.into(),
        }
    }
}

impl From<&RegistrationOutcome> for ApiResponse {
    fn from(outcome: &RegistrationOutcome) -> Self {
        Self::new(outcome.is_registered(), outcome.message())
    }
}

#[derive(Clone)]
struct ApiState {
    service: Arc<RegistrationService>,
}

/// HTTP status for each outcome kind
pub fn status_for(kind: OutcomeKind) -> StatusCode {
    match kind {
        OutcomeKind::Success => StatusCode::CREATED,
        OutcomeKind::ValidationFailure => StatusCode::BAD_REQUEST,
        OutcomeKind::Conflict => StatusCode::CONFLICT,
        OutcomeKind::InternalFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the API router
pub fn router(service: Arc<RegistrationService>, settings: &ServerSettings) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            "/api/register",
            post(register).fallback(method_not_allowed),
        )
        .route("/health", get(health))
        .with_state(ApiState { service })
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(settings.request_timeout()),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve the API until Ctrl-C
pub async fn serve(service: Arc<RegistrationService>, settings: &ServerSettings) -> Result<()> {
    let listener = TcpListener::bind(settings.bind.as_str()).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(service, settings))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

/// Turns the timeout layer's error into a JSON response
async fn handle_middleware_error(err: BoxError) -> (StatusCode, Json<ApiResponse>) {
    if err.is::<Elapsed>() {
        tracing::warn!("request timed out");
        return (
            StatusCode::REQUEST_TIMEOUT,
            Json(ApiResponse::new(false, TIMEOUT_MESSAGE)),
        );
    }
    tracing::error!(error = %err, "unhandled middleware error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::new(false, INTERNAL_MESSAGE)),
    )
}

/// Only a JSON object is a registration. The derived deserializer would
/// also fill the struct from an array by position.
fn registration_from_json(body: Value) -> std::result::Result<RegistrationInput, String> {
    match body {
        body @ Value::Object(_) => serde_json::from_value(body).map_err(|e| e.to_string()),
        _ => Err("request body is not a JSON object".to_string()),
    }
}

async fn register(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    let parsed = payload
        .map_err(|rejection| rejection.to_string())
        .and_then(|Json(body)| registration_from_json(body));

    let input = match parsed {
        Ok(input) => input,
        Err(reason) => {
            tracing::debug!(error = %reason, "rejected request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::new(false, INVALID_JSON_MESSAGE)),
            );
        }
    };

    let outcome = state.service.register(input).await;
    (status_for(outcome.kind()), Json(ApiResponse::from(&outcome)))
}

async fn method_not_allowed() -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiResponse::new(false, METHOD_NOT_ALLOWED_MESSAGE)),
    )
}

async fn health() -> Json<ApiResponse> {
    Json(ApiResponse::new(true, "ok"))
}

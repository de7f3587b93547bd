use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::docker::{ContainerRuntime, RuntimeError};
use crate::monitor::MonitorService;
use crate::notifications::{NotificationService, SenderError};
use crate::scanner::{ScanError, ScannerService};

pub mod container_routes;
pub mod image_routes;
pub mod monitoring_routes;
pub mod notification_routes;
pub mod url_routes;
pub mod vulnerability_routes;

/// Shared application state handed to every handler. Everything the
/// background loop touches lives here too, so there is no process-global
/// mutable state.
pub struct AppState {
    pub pool: SqlitePool,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub notifications: Arc<NotificationService>,
    pub monitor: Arc<MonitorService>,
    pub scanner: Arc<ScannerService>,
}

/// Error type for axum handlers; renders as `{"error": "..."}` with a
/// mapped status code.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    Upstream(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<RuntimeError> for AppError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Unavailable(msg) => {
                AppError::Unavailable(format!("container runtime unavailable: {msg}"))
            }
            RuntimeError::NotFound(msg) => AppError::NotFound(msg),
            RuntimeError::OperationFailed { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("not found".to_string()),
            other => AppError::Internal(format!("database error: {other}")),
        }
    }
}

impl From<SenderError> for AppError {
    fn from(err: SenderError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::NotInstalled(msg) => {
                AppError::Unavailable(format!("scanner not available: {msg}"))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(health_check_handler))
        .merge(container_routes::create_container_router())
        .merge(image_routes::create_image_router())
        .merge(notification_routes::create_webhook_router())
        .merge(monitoring_routes::create_monitoring_router())
        .merge(url_routes::create_url_router())
        .merge(vulnerability_routes::create_vulnerability_router())
        .with_state(state);

    Router::new().nest("/api", api).layer(cors)
}

pub async fn run_http_server(
    state: Arc<AppState>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let router = build_router(state);
    info!(%addr, "HTTP server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    // The running flag in the settings table is left untouched so the loop
    // resumes on the next boot.
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

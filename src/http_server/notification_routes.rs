use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::db::models::{NewWebhook, Webhook, WebhookKind, WebhookUpdate};
use crate::db::services::{settings_service, webhook_service};

use super::{AppError, AppState};

pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhooks", get(list_webhooks_handler).post(create_webhook_handler))
        .route(
            "/webhooks/{id}",
            put(update_webhook_handler).delete(delete_webhook_handler),
        )
        .route("/webhooks/{id}/test", post(test_saved_webhook_handler))
        .route("/webhooks/test", post(test_webhook_handler))
}

fn validate_threshold(value: Option<i64>, field: &str) -> Result<(), AppError> {
    match value {
        Some(v) if !(0..=100).contains(&v) => Err(AppError::BadRequest(format!(
            "{field} must be between 0 and 100"
        ))),
        _ => Ok(()),
    }
}

async fn list_webhooks_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Webhook>>, AppError> {
    let webhooks = webhook_service::get_all_webhooks(&state.pool).await?;
    Ok(Json(webhooks))
}

async fn create_webhook_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewWebhook>,
) -> Result<(StatusCode, Json<Webhook>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".to_string()));
    }
    if payload.url.trim().is_empty() {
        return Err(AppError::BadRequest("url must not be empty".to_string()));
    }
    validate_threshold(payload.cpu_threshold, "cpu_threshold")?;
    validate_threshold(payload.memory_threshold, "memory_threshold")?;

    let settings = settings_service::get_settings(&state.pool).await?;
    let webhook = webhook_service::create_webhook(
        &state.pool,
        &payload,
        settings.cpu_threshold,
        settings.memory_threshold,
    )
    .await?;
    info!(id = webhook.id, name = %webhook.name, "webhook created");
    Ok((StatusCode::CREATED, Json(webhook)))
}

async fn update_webhook_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(update): Json<WebhookUpdate>,
) -> Result<Json<Webhook>, AppError> {
    validate_threshold(update.cpu_threshold, "cpu_threshold")?;
    validate_threshold(update.memory_threshold, "memory_threshold")?;

    match webhook_service::update_webhook(&state.pool, id, &update).await? {
        Some(webhook) => {
            info!(id, "webhook updated");
            Ok(Json(webhook))
        }
        None => Err(AppError::NotFound(format!("webhook {id} not found"))),
    }
}

async fn delete_webhook_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if webhook_service::delete_webhook(&state.pool, id).await? {
        info!(id, "webhook deleted");
        Ok(Json(json!({ "message": "webhook deleted" })))
    } else {
        Err(AppError::NotFound(format!("webhook {id} not found")))
    }
}

/// Fires the canned test payload at an already-saved webhook.
async fn test_saved_webhook_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let webhook = webhook_service::get_webhook_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("webhook {id} not found")))?;
    state
        .notifications
        .send_test(webhook.kind, &webhook.url)
        .await?;
    Ok(Json(json!({ "message": "test notification sent" })))
}

#[derive(Debug, Deserialize)]
struct TestRequest {
    kind: WebhookKind,
    url: String,
}

/// Validates an unsaved (kind, url) pair before the user commits it.
async fn test_webhook_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TestRequest>,
) -> Result<Json<Value>, AppError> {
    if request.url.trim().is_empty() {
        return Err(AppError::BadRequest("url must not be empty".to_string()));
    }
    state
        .notifications
        .send_test(request.kind, &request.url)
        .await?;
    Ok(Json(json!({ "message": "test notification sent" })))
}

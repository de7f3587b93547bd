use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;

use crate::db::models::{MonitoringSettings, SettingsUpdate};
use crate::db::services::settings_service;
use crate::monitor::{LoopTransition, MonitoringStatus};

use super::{AppError, AppState};

pub fn create_monitoring_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/monitoring/status", get(monitoring_status_handler))
        .route("/monitoring/start", post(start_monitoring_handler))
        .route("/monitoring/stop", post(stop_monitoring_handler))
        .route("/monitoring/thresholds", post(update_thresholds_handler))
}

async fn monitoring_status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MonitoringStatus>, AppError> {
    let status = state.monitor.status().await?;
    Ok(Json(status))
}

async fn start_monitoring_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let transition = state.monitor.start().await;
    let message = match transition {
        LoopTransition::AlreadyRunning => "monitoring already running",
        _ => "monitoring started",
    };
    info!(?transition, "monitoring start requested");
    Json(json!({ "status": transition, "message": message }))
}

async fn stop_monitoring_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let transition = state.monitor.stop().await;
    let message = match transition {
        LoopTransition::NotRunning => "monitoring was not running",
        _ => "monitoring stopped",
    };
    info!(?transition, "monitoring stop requested");
    Json(json!({ "status": transition, "message": message }))
}

/// Updates global thresholds and the poll interval. These become the defaults
/// for new webhooks; the loop picks up interval changes on its next cycle.
async fn update_thresholds_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<MonitoringSettings>, AppError> {
    for (value, field) in [
        (update.cpu_threshold, "cpu_threshold"),
        (update.memory_threshold, "memory_threshold"),
    ] {
        if let Some(v) = value {
            if !(0..=100).contains(&v) {
                return Err(AppError::BadRequest(format!(
                    "{field} must be between 0 and 100"
                )));
            }
        }
    }
    if let Some(interval) = update.poll_interval_seconds {
        if interval < 1 {
            return Err(AppError::BadRequest(
                "poll_interval_seconds must be at least 1".to_string(),
            ));
        }
    }

    let settings = settings_service::update_settings(&state.pool, &update).await?;
    info!(
        cpu = settings.cpu_threshold,
        memory = settings.memory_threshold,
        interval = settings.poll_interval_seconds,
        "monitoring thresholds updated"
    );
    Ok(Json(settings))
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::docker::{
    ContainerBrief, ContainerInfo, ExecOutcome, PruneReport, RecreateOutcome, StatsSample,
};

use super::{AppError, AppState};

pub fn create_container_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/containers", get(list_containers_handler))
        .route("/containers/prune", post(prune_containers_handler))
        .route("/containers/{id}", get(container_detail_handler))
        .route("/containers/{id}/stats", get(container_stats_handler))
        .route("/containers/{id}/logs", get(container_logs_handler))
        .route("/containers/{id}/start", post(start_container_handler))
        .route("/containers/{id}/stop", post(stop_container_handler))
        .route("/containers/{id}/restart", post(restart_container_handler))
        .route("/containers/{id}/recreate", post(recreate_container_handler))
        .route("/containers/{id}/remove", post(remove_container_handler))
        .route("/containers/{id}/exec", post(exec_handler))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    show_all: bool,
}

async fn list_containers_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ContainerBrief>>, AppError> {
    let containers = state.runtime.list_containers(query.show_all).await?;
    Ok(Json(containers))
}

async fn container_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ContainerInfo>, AppError> {
    let info = state.runtime.inspect_container(&id).await?;
    Ok(Json(info))
}

async fn container_stats_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatsSample>, AppError> {
    let stats = state.runtime.container_stats(&id).await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    tail: Option<u32>,
}

async fn container_logs_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Value>, AppError> {
    let tail = query.tail.unwrap_or(200);
    let logs = state.runtime.container_logs(&id, tail).await?;
    Ok(Json(json!({ "id": id, "tail": tail, "logs": logs })))
}

async fn start_container_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    match state.runtime.start_container(&id).await {
        Ok(()) => {
            info!(container = %id, "container started");
            Ok(Json(json!({ "message": "container started" })))
        }
        // 304 from the engine means it was already in the requested state.
        Err(err) if err.already_in_target_state() => {
            Ok(Json(json!({ "message": "container already running" })))
        }
        Err(err) => Err(err.into()),
    }
}

async fn stop_container_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    match state.runtime.stop_container(&id).await {
        Ok(()) => {
            info!(container = %id, "container stopped");
            Ok(Json(json!({ "message": "container stopped" })))
        }
        Err(err) if err.already_in_target_state() => {
            Ok(Json(json!({ "message": "container already stopped" })))
        }
        Err(err) => Err(err.into()),
    }
}

async fn restart_container_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.runtime.restart_container(&id).await?;
    info!(container = %id, "container restarted");
    Ok(Json(json!({ "message": "container restarted" })))
}

#[derive(Debug, Deserialize)]
struct RecreateQuery {
    pull: Option<bool>,
}

/// Replaces the container with one built from the same configuration,
/// pulling the image first unless `pull=false`.
async fn recreate_container_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<RecreateQuery>,
) -> Result<Json<RecreateOutcome>, AppError> {
    let outcome = state
        .runtime
        .recreate_container(&id, query.pull.unwrap_or(true))
        .await?;
    info!(
        container = %id,
        new_id = %outcome.id,
        pulled = outcome.pulled_new_image,
        "container recreated"
    );
    Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
struct RemoveQuery {
    #[serde(default)]
    force: bool,
}

async fn remove_container_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<RemoveQuery>,
) -> Result<Json<Value>, AppError> {
    state.runtime.remove_container(&id, query.force).await?;
    info!(container = %id, force = query.force, "container removed");
    Ok(Json(json!({ "message": "container removed" })))
}

async fn prune_containers_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PruneReport>, AppError> {
    let report = state.runtime.prune_containers().await?;
    info!(
        deleted = report.deleted.len(),
        reclaimed = report.space_reclaimed,
        "containers pruned"
    );
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct ExecRequest {
    cmd: Vec<String>,
    working_dir: Option<String>,
}

async fn exec_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ExecRequest>,
) -> Result<Json<ExecOutcome>, AppError> {
    if request.cmd.is_empty() {
        return Err(AppError::BadRequest("cmd must not be empty".to_string()));
    }
    let outcome = state
        .runtime
        .exec(&id, request.cmd, request.working_dir)
        .await?;
    Ok(Json(outcome))
}

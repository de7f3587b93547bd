use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::docker::{ImageInfo, PruneReport};

use super::{AppError, AppState};

pub fn create_image_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/images", get(list_images_handler))
        .route("/images/pull", post(pull_image_handler))
        .route("/images/prune", post(prune_images_handler))
        .route("/images/{id}", delete(remove_image_handler))
}

async fn list_images_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ImageInfo>>, AppError> {
    let images = state.runtime.list_images().await?;
    Ok(Json(images))
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    reference: String,
}

async fn pull_image_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PullRequest>,
) -> Result<Json<Value>, AppError> {
    if request.reference.trim().is_empty() {
        return Err(AppError::BadRequest(
            "reference must not be empty".to_string(),
        ));
    }
    state.runtime.pull_image(&request.reference).await?;
    info!(reference = %request.reference, "image pulled");
    Ok(Json(json!({ "message": "image pulled", "reference": request.reference })))
}

#[derive(Debug, Default, Deserialize)]
struct RemoveQuery {
    #[serde(default)]
    force: bool,
}

async fn remove_image_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<RemoveQuery>,
) -> Result<Json<Value>, AppError> {
    state.runtime.remove_image(&id, query.force).await?;
    info!(image = %id, force = query.force, "image removed");
    Ok(Json(json!({ "message": "image removed" })))
}

async fn prune_images_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PruneReport>, AppError> {
    let report = state.runtime.prune_images().await?;
    info!(
        deleted = report.deleted.len(),
        reclaimed = report.space_reclaimed,
        "images pruned"
    );
    Ok(Json(report))
}

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::db::models::{NewSharedUrl, SharedUrl, SharedUrlUpdate};
use crate::db::services::url_service;

use super::{AppError, AppState};

pub fn create_url_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/urls", get(list_urls_handler).post(create_url_handler))
        .route("/urls/categories", get(list_categories_handler))
        .route(
            "/urls/{id}",
            put(update_url_handler).delete(delete_url_handler),
        )
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    category: Option<String>,
}

async fn list_urls_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SharedUrl>>, AppError> {
    let urls = url_service::get_all_urls(&state.pool, query.category.as_deref()).await?;
    Ok(Json(urls))
}

async fn list_categories_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, AppError> {
    let categories = url_service::get_categories(&state.pool).await?;
    Ok(Json(categories))
}

async fn create_url_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewSharedUrl>,
) -> Result<(StatusCode, Json<SharedUrl>), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be empty".to_string()));
    }
    if payload.url.trim().is_empty() {
        return Err(AppError::BadRequest("url must not be empty".to_string()));
    }
    let url = url_service::create_url(&state.pool, &payload).await?;
    info!(id = url.id, title = %url.title, "shared url created");
    Ok((StatusCode::CREATED, Json(url)))
}

async fn update_url_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(update): Json<SharedUrlUpdate>,
) -> Result<Json<SharedUrl>, AppError> {
    match url_service::update_url(&state.pool, id, &update).await? {
        Some(url) => Ok(Json(url)),
        None => Err(AppError::NotFound(format!("url {id} not found"))),
    }
}

async fn delete_url_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if url_service::delete_url(&state.pool, id).await? {
        info!(id, "shared url deleted");
        Ok(Json(json!({ "message": "url deleted" })))
    } else {
        Err(AppError::NotFound(format!("url {id} not found")))
    }
}

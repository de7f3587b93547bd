use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::scanner::ScanReport;

use super::{AppError, AppState};

const DEFAULT_SEVERITY: &str = "CRITICAL,HIGH";
const KNOWN_SEVERITIES: [&str; 5] = ["CRITICAL", "HIGH", "MEDIUM", "LOW", "UNKNOWN"];

pub fn create_vulnerability_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/vulnerabilities/status", get(scanner_status_handler))
        .route("/vulnerabilities/scan", get(scan_image_handler))
}

async fn scanner_status_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let available = state.scanner.is_available().await;
    Json(json!({ "available": available }))
}

#[derive(Debug, Deserialize)]
struct ScanQuery {
    image: String,
    severity: Option<String>,
}

async fn scan_image_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScanQuery>,
) -> Result<Json<ScanReport>, AppError> {
    if query.image.trim().is_empty() {
        return Err(AppError::BadRequest("image must not be empty".to_string()));
    }
    let severity = query
        .severity
        .as_deref()
        .unwrap_or(DEFAULT_SEVERITY)
        .to_ascii_uppercase();
    for level in severity.split(',') {
        if !KNOWN_SEVERITIES.contains(&level.trim()) {
            return Err(AppError::BadRequest(format!(
                "unknown severity level: {level}"
            )));
        }
    }

    let report = state.scanner.scan_image(&query.image, &severity).await?;
    Ok(Json(report))
}

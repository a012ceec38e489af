//! Operational endpoints: status, health, cache admin, operations, metrics
//! and the model catalog

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::error::ApiError;
use super::AppState;
use crate::error::GatewayError;
use crate::generation::DEFAULT_MODEL;
use crate::models::supported_models;
use crate::operations::OperationRecord;

/// Header carrying the cache admin key
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let settings = &state.gateway.settings;
    Json(json!({
        "success": true,
        "configured": settings.is_configured(),
        "location": settings.location,
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "vertex-ai",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CacheQuery {
    pub operation: Option<String>,
}

pub async fn cache(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CacheQuery>,
) -> Result<Json<Value>, ApiError> {
    let presented = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    if !state.gateway.settings.admin_key_matches(presented) {
        warn!(operation = ?query.operation, "Cache admin request with invalid key");
        return Err(GatewayError::Forbidden("invalid admin key".to_string()).into());
    }

    let cache = &state.gateway.cache;
    match query.operation.as_deref() {
        Some("clear") => {
            let cleared = cache.clear().await;
            info!(cleared, "Cache cleared");
            Ok(Json(json!({
                "success": true,
                "message": format!("Cleared {cleared} cache entries"),
                "cleared": cleared,
            })))
        }
        Some("stats") => Ok(Json(json!({
            "success": true,
            "stats": cache.stats().await,
        }))),
        _ => Err(GatewayError::validation("operation must be 'clear' or 'stats'").into()),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationView {
    pub success: bool,
    #[serde(flatten)]
    pub record: OperationRecord,
    pub elapsed_ms: i64,
}

pub async fn operation(
    State(state): State<AppState>,
    Path(operation_id): Path<String>,
) -> Result<Json<OperationView>, ApiError> {
    let record = state
        .gateway
        .operations
        .get(&operation_id)
        .await
        .ok_or_else(|| GatewayError::NotFound(format!("operation '{operation_id}' not found")))?;

    let elapsed_ms = record.elapsed_ms(Utc::now());
    Ok(Json(OperationView {
        success: true,
        record,
        elapsed_ms,
    }))
}

/// Informational snapshot; request telemetry is not aggregated
pub async fn metrics(State(state): State<AppState>) -> Json<Value> {
    let gateway = &state.gateway;
    Json(json!({
        "success": true,
        "metrics": {
            "uptimeSeconds": state.started_at.elapsed().as_secs(),
            "cacheEntries": gateway.cache.len().await,
            "activeOperations": gateway.operations.active_count().await,
            "trackedOperations": gateway.operations.len().await,
            "retryPolicy": gateway.executor.policy(),
            "requests": { "note": "request telemetry is not collected" },
        },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn models() -> Json<Value> {
    Json(json!({
        "success": true,
        "models": supported_models(),
        "defaultModel": DEFAULT_MODEL,
    }))
}

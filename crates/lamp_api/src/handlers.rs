use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use common::ArduinoResponse;
use lamp_service::LampStatus;
use serde_json::{json, Value};
use tracing::warn;

use crate::{ApiError, AppState};

pub async fn lamp_config(
    State(state): State<Arc<AppState>>,
    Path(lamp_id): Path<String>,
) -> Result<Json<ArduinoResponse>, ApiError> {
    let response = state.service.get_config(&lamp_id).await?;
    Ok(Json(response))
}

pub async fn list_lamps(State(state): State<Arc<AppState>>) -> Result<Json<Vec<LampStatus>>, ApiError> {
    Ok(Json(state.service.overview().await?))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": state.version,
        "started_at": state.started_at,
    }))
}

pub async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let cache = state.cache.ping().await;
    let upstream = state.fetcher.ping().await;

    let check = |result: &Result<(), common::Error>| match result {
        Ok(()) => "ok".to_string(),
        Err(e) => e.to_string(),
    };
    let body = json!({
        "status": if cache.is_ok() && upstream.is_ok() { "ready" } else { "not_ready" },
        "checks": {
            "cache": check(&cache),
            "upstream": check(&upstream),
        },
    });

    if cache.is_ok() && upstream.is_ok() {
        (StatusCode::OK, Json(body))
    } else {
        warn!(
            cache = %check(&cache),
            upstream = %check(&upstream),
            "Readiness check failed"
        );
        (StatusCode::SERVICE_UNAVAILABLE, Json(body))
    }
}

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap as AxumHeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use repopal_core::providers::HeaderMap;
use repopal_core::types::Provider;
use serde_json::json;
use tracing::{info, warn};

use crate::AppState;

fn to_core_headers(headers: &AxumHeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            out.insert(name.as_str(), value);
        }
    }
    out
}

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

/// `POST /api/webhooks/{provider}`. Validates against the raw bytes as
/// received, normalizes, acknowledges immediately, and hands the event off
/// to the pipeline on a spawned task — the HTTP layer never blocks on a
/// pipeline run.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: AxumHeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let Some(provider) = Provider::from_path_segment(&provider) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "unsupported provider" }))).into_response();
    };

    // Linear is a recognized path segment with no shipped adapter: accept
    // rather than 400, but don't pretend to validate or normalize a payload
    // we have no capability set for.
    if provider == Provider::Linear {
        return (StatusCode::OK, Json(json!({ "status": "unsupported-provider" }))).into_response();
    }

    let Some(adapter) = state.adapters.get(&provider) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "unsupported provider" }))).into_response();
    };

    let core_headers = to_core_headers(&headers);
    if !adapter.validate(&core_headers, &body) {
        warn!(?provider, "webhook signature validation failed");
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "signature invalid" }))).into_response();
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => return (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid json body" }))).into_response(),
    };

    // Slack's URL verification handshake short-circuits before normalization
    // ever reaches the pipeline.
    if payload.get("type").and_then(|v| v.as_str()) == Some("url_verification") {
        let challenge = payload.get("challenge").cloned().unwrap_or(serde_json::Value::Null);
        return (StatusCode::OK, Json(json!({ "challenge": challenge }))).into_response();
    }

    let event = adapter.normalize(payload);
    let event_json = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);

    let pipeline = Arc::clone(&state.pipeline);
    let spawned_event = event;
    tokio::spawn(async move {
        if let Err(err) = pipeline.handle(spawned_event).await {
            info!(%err, "pipeline invocation ended with an error");
        }
    });

    (StatusCode::OK, Json(event_json)).into_response()
}

//! Service introspection endpoints (/, /health, /quota, /cache/*)

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/quota", get(quota))
        .route("/cache/info", get(cache_info))
        .route("/cache/clear", post(cache_clear))
}

/// GET / - service banner with endpoint listing
async fn root() -> Json<Value> {
    Json(json!({
        "name": "aifd-api",
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "endpoints": {
            "/detect": "POST - Analyze media for AI generation",
            "/detect/nsfw": "POST - Analyze media for NSFW content",
            "/quota": "GET - Get quota usage",
            "/health": "GET - Health check",
            "/cache/info": "GET - Cache information",
            "/cache/clear": "POST - Flush cached verdicts",
        }
    }))
}

/// GET /health - liveness plus quota and cache snapshot
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "timestamp": Utc::now().to_rfc3339(),
        "quota": state.detector.quota_status(),
        "cache_size": state.detector.cache_size(),
    }))
}

/// GET /quota - current quota usage
async fn quota(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "quota": state.detector.quota_status(),
    }))
}

/// GET /cache/info - cache size and quota
async fn cache_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "size": state.detector.cache_size(),
        "quota": state.detector.quota_status(),
    }))
}

/// POST /cache/clear - flush all cached verdicts
async fn cache_clear(State(state): State<Arc<AppState>>) -> Json<Value> {
    let size = state.detector.clear_cache();
    println!("[cache] flushed by request");
    Json(json!({
        "ok": true,
        "message": "Cache cleared",
        "size": size,
    }))
}

mod constants;
mod fingerprint;
mod models;
mod routes;
mod services;

use axum::extract::DefaultBodyLimit;
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use constants::{
    AI_OR_NOT_IMAGE_API_URL, AI_OR_NOT_VIDEO_API_URL, DEFAULT_QUOTA_LIMIT, MAX_UPLOAD_SIZE,
    NSFW_API_URL,
};
use services::cache::DecisionCache;
use services::detector::Detector;
use services::quota::QuotaTracker;
use services::vendor::HttpVendorClient;

pub struct AppState {
    pub detector: Detector<HttpVendorClient>,
    /// Client for fetching caller-supplied media URLs
    pub http: reqwest::Client,
}

fn quota_limit() -> u32 {
    env::var("QUOTA_LIMIT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_QUOTA_LIMIT)
}

fn endpoint_override(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() {
    let ai_api_key = env::var("AI_OR_NOT_API_KEY").ok();
    let nsfw_api_key = env::var("NSFW_API_KEY").ok();
    if ai_api_key.is_none() {
        eprintln!("[startup] AI_OR_NOT_API_KEY not set; /detect will return 500");
    }
    if nsfw_api_key.is_none() {
        eprintln!("[startup] NSFW_API_KEY not set; /detect/nsfw will return 500");
    }

    let transport = HttpVendorClient::new(
        ai_api_key,
        nsfw_api_key,
        endpoint_override("AI_OR_NOT_IMAGE_API_URL", AI_OR_NOT_IMAGE_API_URL),
        endpoint_override("AI_OR_NOT_VIDEO_API_URL", AI_OR_NOT_VIDEO_API_URL),
        endpoint_override("NSFW_API_URL", NSFW_API_URL),
    );

    let limit = quota_limit();
    let state = Arc::new(AppState {
        detector: Detector::new(transport, QuotaTracker::new(limit), DecisionCache::new()),
        http: reqwest::Client::new(),
    });

    let app = routes::build_routes()
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = env::var("PORT").unwrap_or_else(|_| "3500".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", addr, e));

    println!("Listening on http://{}", addr);
    println!("[startup] quota limit: {} vendor calls", limit);
    axum::serve(listener, app).await.expect("Server failed");
}

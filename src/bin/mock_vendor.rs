//! Standalone mock of the AI-or-Not vendor API for local development.
//!
//! Serves the same report shapes as the real v2 endpoints so the gateway
//! can be exercised end to end without burning vendor credits. Point the
//! gateway at it with `AI_OR_NOT_IMAGE_API_URL=http://localhost:5000/v2/image/sync`.
//!
//! ## Environment Variables
//! - `MOCK_VENDOR_PORT` - port to listen on (default: `5000`)

use axum::{Json, Router, routing::post};
use chrono::Utc;
use rand::Rng;
use serde_json::{Value, json};

/// Generator list from the vendor's published documentation
const IMAGE_GENERATORS: [&str; 7] = [
    "midjourney",
    "dall_e",
    "stable_diffusion",
    "this_person_does_not_exist",
    "adobe_firefly",
    "flux",
    "four_o",
];

fn random_hex_id() -> String {
    format!("{:032x}", rand::rng().random::<u128>())
}

/// POST /v2/image/sync and /v2/text/sync - synchronous detection report
async fn sync_detection() -> Json<Value> {
    let mut rng = rand::rng();
    let is_ai = rng.random_bool(0.5);
    let detected_gen = if is_ai {
        Some(IMAGE_GENERATORS[rng.random_range(0..IMAGE_GENERATORS.len())])
    } else {
        None
    };

    let high = rng.random_range(0.9..0.99);
    let low = rng.random_range(0.01..0.1);
    let (ai_conf, human_conf) = if is_ai { (high, low) } else { (low, high) };

    let mut generators = serde_json::Map::new();
    for generator in IMAGE_GENERATORS {
        let hit = Some(generator) == detected_gen;
        generators.insert(
            generator.to_string(),
            json!({
                "is_detected": hit,
                "confidence": if hit {
                    rng.random_range(0.8..0.95)
                } else {
                    rng.random_range(0.001..0.01)
                },
            }),
        );
    }

    Json(json!({
        "id": random_hex_id(),
        "created_at": Utc::now().to_rfc3339(),
        "report": {
            "ai_generated": {
                "verdict": if is_ai { "ai" } else { "human" },
                "ai": {"is_detected": is_ai, "confidence": ai_conf},
                "human": {"is_detected": !is_ai, "confidence": human_conf},
                "generator": generators,
            },
            "deepfake": {"is_detected": false, "confidence": 0.02, "rois": []},
            "nsfw": {"is_detected": false},
            "quality": {"is_detected": true},
        },
        "external_id": "mock-tracking-id",
    }))
}

/// POST /v2/video/detect-file - asynchronous video job submission
async fn video_upload() -> Json<Value> {
    Json(json!({"job_id": random_hex_id(), "status": "queued"}))
}

/// POST /query - video job result
async fn video_query(body: axum::body::Bytes) -> Json<Value> {
    let mut rng = rand::rng();
    let is_ai = rng.random_bool(0.5);
    let conf = rng.random_range(0.9..0.99);

    let job_id = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|v| v.get("job_id").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(random_hex_id);

    Json(json!({
        "id": job_id,
        "report": {
            "ai_video": {"is_detected": is_ai, "confidence": conf},
            "ai_voice": {"is_detected": is_ai, "confidence": conf},
            "meta": {"audio": "processed", "video": "processed"},
        },
        "external_id": "mock-query",
        "created_at": Utc::now().to_rfc3339(),
    }))
}

#[tokio::main]
async fn main() {
    let app = Router::new()
        .route("/v2/image/sync", post(sync_detection))
        .route("/v2/text/sync", post(sync_detection))
        .route("/v2/video/detect-file", post(video_upload))
        .route("/query", post(video_query));

    let port = std::env::var("MOCK_VENDOR_PORT").unwrap_or_else(|_| "5000".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", addr, e));

    println!("Mock vendor listening on http://{}", addr);
    axum::serve(listener, app).await.expect("Server failed");
}

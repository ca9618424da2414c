//! Detection endpoints (/detect, /detect/nsfw)
//!
//! Both accept either `multipart/form-data` with a `file` field or a JSON
//! body with one of `image` (base64, optional `data:` prefix), `media_url`
//! / `url`, or `video_data` (base64).

use axum::{
    Json, Router,
    extract::{FromRequest, Multipart, Request, State},
    routing::post,
};
use base64::Engine;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use crate::AppState;
use crate::constants::{MAX_UPLOAD_SIZE, MEDIA_URL_FETCH_TIMEOUT_SECS};
use crate::models::{DetectionResult, DetectorKind, MediaType};
use crate::services::detector::Detection;
use crate::services::error::DetectError;
use crate::services::vendor::credential_var;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/detect", post(detect_ai))
        .route("/detect/nsfw", post(detect_nsfw))
}

/// POST /detect - AI-generation analysis
async fn detect_ai(
    state: State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Value>, DetectError> {
    handle_detect(state, request, DetectorKind::AiGenerated).await
}

/// POST /detect/nsfw - NSFW moderation
async fn detect_nsfw(
    state: State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Value>, DetectError> {
    handle_detect(state, request, DetectorKind::Nsfw).await
}

/// JSON body accepted by the detect endpoints
#[derive(Debug, Default, Deserialize)]
struct DetectPayload {
    image: Option<String>,
    media_url: Option<String>,
    url: Option<String>,
    video_data: Option<String>,
    media_type: Option<String>,
    filename: Option<String>,
}

/// Decoded media ready for analysis
struct MediaInput {
    bytes: Vec<u8>,
    filename: String,
    media_type: MediaType,
}

async fn handle_detect(
    State(state): State<Arc<AppState>>,
    request: Request,
    kind: DetectorKind,
) -> Result<Json<Value>, DetectError> {
    if !state.detector.has_credential(kind) {
        return Err(DetectError::VendorConfigMissing(credential_var(kind)));
    }

    let is_multipart = request
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let input = if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| DetectError::InvalidEncoding(format!("Invalid multipart body: {}", e)))?;
        read_multipart(multipart).await?
    } else {
        let body = axum::body::to_bytes(request.into_body(), MAX_UPLOAD_SIZE)
            .await
            .map_err(|e| DetectError::InvalidEncoding(format!("Failed to read body: {}", e)))?;
        let payload: DetectPayload = serde_json::from_slice(&body).unwrap_or_default();
        resolve_json_payload(&state, payload).await?
    };

    let detection = state
        .detector
        .analyze(&input.bytes, kind, input.media_type, &input.filename)
        .await?;

    Ok(Json(build_envelope(&state, &detection, input.media_type)))
}

async fn read_multipart(mut multipart: Multipart) -> Result<MediaInput, DetectError> {
    let mut file: Option<(Vec<u8>, String)> = None;
    let mut declared_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DetectError::InvalidEncoding(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| DetectError::InvalidEncoding("Missing filename".into()))?;
                let data = field.bytes().await.map_err(|e| {
                    DetectError::InvalidEncoding(format!("Failed to read upload: {}", e))
                })?;
                file = Some((data.to_vec(), filename));
            }
            Some("media_type") => {
                declared_type = field.text().await.ok();
            }
            _ => {}
        }
    }

    let (bytes, filename) = file
        .ok_or_else(|| DetectError::InvalidEncoding("No image or media_url provided".into()))?;

    Ok(MediaInput {
        bytes,
        filename,
        media_type: MediaType::from_declared(declared_type.as_deref()),
    })
}

async fn resolve_json_payload(
    state: &AppState,
    payload: DetectPayload,
) -> Result<MediaInput, DetectError> {
    let media_type = MediaType::from_declared(payload.media_type.as_deref());

    if let Some(image) = payload.image {
        let bytes = decode_base64(&image)?;
        let filename = payload.filename.unwrap_or_else(|| match media_type {
            MediaType::Video => "inline-upload.mp4".to_string(),
            MediaType::Image => "inline-upload.jpg".to_string(),
        });
        return Ok(MediaInput {
            bytes,
            filename,
            media_type,
        });
    }

    if let Some(video_data) = payload.video_data {
        let bytes = decode_base64(&video_data)?;
        let filename = payload
            .filename
            .unwrap_or_else(|| "inline-upload.mp4".to_string());
        return Ok(MediaInput {
            bytes,
            filename,
            media_type: MediaType::Video,
        });
    }

    if let Some(url) = payload.media_url.or(payload.url) {
        let bytes = fetch_media_url(state, &url).await?;
        let filename = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match media_type {
                MediaType::Video => "remote.mp4".to_string(),
                MediaType::Image => "remote.jpg".to_string(),
            });
        return Ok(MediaInput {
            bytes,
            filename,
            media_type,
        });
    }

    Err(DetectError::InvalidEncoding(
        "No image or media_url provided".into(),
    ))
}

/// Decode an inline base64 payload, tolerating a `data:` URL prefix
fn decode_base64(value: &str) -> Result<Vec<u8>, DetectError> {
    let raw = if value.starts_with("data:") {
        value.split_once(',').map(|(_, rest)| rest).unwrap_or(value)
    } else {
        value
    };

    base64::engine::general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|e| DetectError::InvalidEncoding(format!("Invalid base64: {}", e)))
}

async fn fetch_media_url(state: &AppState, url: &str) -> Result<Vec<u8>, DetectError> {
    let resp = state
        .http
        .get(url)
        .timeout(Duration::from_secs(MEDIA_URL_FETCH_TIMEOUT_SECS))
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| DetectError::InvalidEncoding(format!("Failed to fetch media_url: {}", e)))?;

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| DetectError::InvalidEncoding(format!("Failed to fetch media_url: {}", e)))?;

    Ok(bytes.to_vec())
}

fn build_envelope(state: &AppState, detection: &Detection, media_type: MediaType) -> Value {
    let quota = state.detector.quota_status();

    match detection.result {
        DetectionResult::Ai { is_ai, confidence } => json!({
            "ok": true,
            "is_ai": is_ai,
            "confidence": confidence,
            "cached": detection.cached,
            "hash": detection.fingerprint.as_str(),
            "media_type": media_type.as_str(),
            "quota": quota,
        }),
        DetectionResult::Nsfw {
            is_nsfw,
            score,
            category,
        } => json!({
            "ok": true,
            "is_nsfw": is_nsfw,
            "score": score,
            "category": category.as_str(),
            "cached": detection.cached,
            "hash": detection.fingerprint.as_str(),
            "media_type": media_type.as_str(),
            "quota": quota,
        }),
    }
}

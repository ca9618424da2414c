//! Outbound vendor transport
//!
//! One client covers both detectors:
//! - AI-or-Not style detection: multipart upload of the raw media, bearer
//!   auth, separate image and video endpoints.
//! - NSFW moderation: JSON request to a generative-model endpoint with
//!   the media inlined as base64 plus a fixed moderation prompt.
//!
//! Calls are single-attempt. Retrying here would change quota-consumption
//! semantics upstream, so failures surface directly.

use std::future::Future;
use std::time::Duration;

use base64::Engine;
use reqwest::Client;
use serde_json::{Value, json};

use crate::constants::{AI_VENDOR_TIMEOUT_SECS, NSFW_VENDOR_TIMEOUT_SECS};
use crate::models::{DetectorKind, MediaType};

/// Prompt sent alongside the media for NSFW moderation. The model is
/// asked for bare JSON, but responses routinely wrap it in prose or
/// markdown fences — the normalizer handles that.
const MODERATION_PROMPT: &str = "Analyze this media for NSFW content. Respond with only a JSON \
object of the form {\"is_nsfw\": boolean, \"score\": number between 0.0 and 1.0, \"category\": \
one of \"none\", \"sexual\", \"nudity\", \"suggestive\", \"violence\", \"gore\", \"explicit\"}.";

/// Vendor transport failure
#[derive(Debug)]
pub enum VendorError {
    /// Network failure or timeout
    Http(reqwest::Error),
    /// Non-2xx response; carries status and a body preview
    Status(u16, String),
    /// Response body was not JSON
    BadBody(String),
    /// No credential configured for the requested detector
    MissingCredential(&'static str),
}

impl std::fmt::Display for VendorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VendorError::Http(e) => write!(f, "{}", e),
            VendorError::Status(code, preview) => write!(f, "status {}: {}", code, preview),
            VendorError::BadBody(s) => write!(f, "unparseable body: {}", s),
            VendorError::MissingCredential(var) => write!(f, "{} not configured", var),
        }
    }
}

impl std::error::Error for VendorError {}

impl From<reqwest::Error> for VendorError {
    fn from(e: reqwest::Error) -> Self {
        VendorError::Http(e)
    }
}

/// Seam between the orchestrator and vendor HTTP. Tests substitute their
/// own implementations; production uses [`HttpVendorClient`].
pub trait VendorTransport: Send + Sync {
    fn call_vendor(
        &self,
        bytes: &[u8],
        kind: DetectorKind,
        media_type: MediaType,
        filename: &str,
    ) -> impl Future<Output = Result<Value, VendorError>> + Send;

    /// Whether a credential is configured for the given detector
    fn has_credential(&self, _kind: DetectorKind) -> bool {
        true
    }
}

/// Environment-variable name for each detector's credential
pub fn credential_var(kind: DetectorKind) -> &'static str {
    match kind {
        DetectorKind::AiGenerated => "AI_OR_NOT_API_KEY",
        DetectorKind::Nsfw => "NSFW_API_KEY",
    }
}

/// Production vendor client
pub struct HttpVendorClient {
    http: Client,
    ai_api_key: Option<String>,
    nsfw_api_key: Option<String>,
    ai_image_url: String,
    ai_video_url: String,
    nsfw_url: String,
}

impl HttpVendorClient {
    pub fn new(
        ai_api_key: Option<String>,
        nsfw_api_key: Option<String>,
        ai_image_url: String,
        ai_video_url: String,
        nsfw_url: String,
    ) -> Self {
        Self {
            http: Client::new(),
            ai_api_key,
            nsfw_api_key,
            ai_image_url,
            ai_video_url,
            nsfw_url,
        }
    }

    async fn call_aiornot(
        &self,
        bytes: &[u8],
        media_type: MediaType,
        filename: &str,
    ) -> Result<Value, VendorError> {
        let api_key = self
            .ai_api_key
            .as_deref()
            .ok_or(VendorError::MissingCredential("AI_OR_NOT_API_KEY"))?;

        let (endpoint, field_name) = match media_type {
            MediaType::Video => (self.ai_video_url.as_str(), "video"),
            MediaType::Image => (self.ai_image_url.as_str(), "image"),
        };
        let content_type = guess_content_type(filename, media_type);

        println!(
            "[vendor] aiornot request endpoint={} media_type={} filename={} bytes={}",
            endpoint,
            media_type.as_str(),
            filename,
            bytes.len()
        );

        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(VendorError::Http)?;
        let form = reqwest::multipart::Form::new().part(field_name.to_string(), part);

        let resp = self
            .http
            .post(endpoint)
            .bearer_auth(api_key)
            .header("Accept", "application/json")
            .multipart(form)
            .timeout(Duration::from_secs(AI_VENDOR_TIMEOUT_SECS))
            .send()
            .await?;

        read_json_response(resp, "aiornot").await
    }

    async fn call_nsfw(
        &self,
        bytes: &[u8],
        media_type: MediaType,
        filename: &str,
    ) -> Result<Value, VendorError> {
        let api_key = self
            .nsfw_api_key
            .as_deref()
            .ok_or(VendorError::MissingCredential("NSFW_API_KEY"))?;

        let content_type = guess_content_type(filename, media_type);
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);

        println!(
            "[vendor] nsfw request endpoint={} filename={} bytes={}",
            self.nsfw_url,
            filename,
            bytes.len()
        );

        let body = json!({
            "contents": [{
                "parts": [
                    {"inline_data": {"mime_type": content_type, "data": encoded}},
                    {"text": MODERATION_PROMPT},
                ]
            }]
        });

        let resp = self
            .http
            .post(&self.nsfw_url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .timeout(Duration::from_secs(NSFW_VENDOR_TIMEOUT_SECS))
            .send()
            .await?;

        read_json_response(resp, "nsfw").await
    }
}

impl VendorTransport for HttpVendorClient {
    async fn call_vendor(
        &self,
        bytes: &[u8],
        kind: DetectorKind,
        media_type: MediaType,
        filename: &str,
    ) -> Result<Value, VendorError> {
        match kind {
            DetectorKind::AiGenerated => self.call_aiornot(bytes, media_type, filename).await,
            DetectorKind::Nsfw => self.call_nsfw(bytes, media_type, filename).await,
        }
    }

    fn has_credential(&self, kind: DetectorKind) -> bool {
        match kind {
            DetectorKind::AiGenerated => self.ai_api_key.is_some(),
            DetectorKind::Nsfw => self.nsfw_api_key.is_some(),
        }
    }
}

async fn read_json_response(resp: reqwest::Response, tag: &str) -> Result<Value, VendorError> {
    let status = resp.status();
    let body = resp.text().await?;
    let preview: String = body.chars().take(500).collect();

    println!(
        "[vendor] {} response status={} body_preview={:?}",
        tag,
        status.as_u16(),
        preview
    );

    if !status.is_success() {
        return Err(VendorError::Status(status.as_u16(), preview));
    }

    serde_json::from_str(&body).map_err(|_| VendorError::BadBody(preview))
}

/// Best-effort content type from the filename extension, falling back to
/// a sensible default per media type
pub fn guess_content_type(filename: &str, media_type: MediaType) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => match media_type {
            MediaType::Video => "video/mp4",
            MediaType::Image => "image/jpeg",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("photo.PNG", MediaType::Image), "image/png");
        assert_eq!(guess_content_type("clip.mp4", MediaType::Video), "video/mp4");
        assert_eq!(guess_content_type("upload", MediaType::Image), "image/jpeg");
        assert_eq!(guess_content_type("upload", MediaType::Video), "video/mp4");
        assert_eq!(guess_content_type("archive.tar.gz", MediaType::Image), "image/jpeg");
    }

    #[test]
    fn test_has_credential() {
        let client = HttpVendorClient::new(
            Some("key".into()),
            None,
            "http://ai".into(),
            "http://ai-video".into(),
            "http://nsfw".into(),
        );
        assert!(client.has_credential(DetectorKind::AiGenerated));
        assert!(!client.has_credential(DetectorKind::Nsfw));
    }
}

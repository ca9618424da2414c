//! Error types for detection requests
//!
//! Every failure here is per-request; nothing is fatal to the process.
//! Malformed vendor JSON is deliberately *not* represented — it degrades
//! to a normalizer default instead of failing the request.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::models::QuotaStatus;

/// Error outcomes of a detection request
#[derive(Debug)]
pub enum DetectError {
    /// Zero-byte media payload
    EmptyInput,
    /// Malformed base64, unreachable media_url, or similar input problem
    InvalidEncoding(String),
    /// No vendor credits left in this accounting window
    QuotaExceeded(QuotaStatus),
    /// Vendor network failure, timeout, or non-2xx status
    UpstreamUnavailable(String),
    /// No vendor credential configured
    VendorConfigMissing(&'static str),
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::EmptyInput => write!(f, "Empty media payload"),
            DetectError::InvalidEncoding(s) => write!(f, "{}", s),
            DetectError::QuotaExceeded(_) => write!(f, "Quota limit reached"),
            DetectError::UpstreamUnavailable(s) => write!(f, "AI detection API error: {}", s),
            DetectError::VendorConfigMissing(var) => {
                write!(f, "Missing {} in environment", var)
            }
        }
    }
}

impl std::error::Error for DetectError {}

impl DetectError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DetectError::EmptyInput | DetectError::InvalidEncoding(_) => StatusCode::BAD_REQUEST,
            DetectError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            DetectError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DetectError::VendorConfigMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            eprintln!("[detect] request failed: {}", self);
        }

        let body = match &self {
            DetectError::QuotaExceeded(quota) => json!({
                "ok": false,
                "error": self.to_string(),
                "quota": quota,
            }),
            _ => json!({
                "ok": false,
                "error": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(DetectError::EmptyInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            DetectError::InvalidEncoding("bad base64".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DetectError::QuotaExceeded(QuotaStatus {
                used: 10,
                remaining: 0,
                limit: 10
            })
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            DetectError::UpstreamUnavailable("timeout".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            DetectError::VendorConfigMissing("AI_OR_NOT_API_KEY").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

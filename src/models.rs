//! Shared data models used across modules

use serde::{Deserialize, Serialize};

/// Which third-party detector to run against a piece of media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    /// AI-or-Not style "is this AI generated" classifier
    AiGenerated,
    /// Generative-model NSFW moderation
    Nsfw,
}

/// Declared media type of an incoming payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }

    /// Parse the `media_type` field callers send; anything but "video" is an image
    pub fn from_declared(value: Option<&str>) -> Self {
        match value {
            Some("video") => MediaType::Video,
            _ => MediaType::Image,
        }
    }
}

/// NSFW content category reported by the moderation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NsfwCategory {
    None,
    Sexual,
    Nudity,
    Suggestive,
    Violence,
    Gore,
    Explicit,
    Unknown,
    VideoUnsupported,
}

impl NsfwCategory {
    /// Validate a vendor-supplied category string against the known set
    pub fn parse(value: &str) -> Self {
        match value {
            "none" => NsfwCategory::None,
            "sexual" => NsfwCategory::Sexual,
            "nudity" => NsfwCategory::Nudity,
            "suggestive" => NsfwCategory::Suggestive,
            "violence" => NsfwCategory::Violence,
            "gore" => NsfwCategory::Gore,
            "explicit" => NsfwCategory::Explicit,
            "video_unsupported" => NsfwCategory::VideoUnsupported,
            _ => NsfwCategory::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NsfwCategory::None => "none",
            NsfwCategory::Sexual => "sexual",
            NsfwCategory::Nudity => "nudity",
            NsfwCategory::Suggestive => "suggestive",
            NsfwCategory::Violence => "violence",
            NsfwCategory::Gore => "gore",
            NsfwCategory::Explicit => "explicit",
            NsfwCategory::Unknown => "unknown",
            NsfwCategory::VideoUnsupported => "video_unsupported",
        }
    }
}

/// Canonical outcome of a detection, normalized from vendor JSON
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionResult {
    /// AI-generation verdict; confidence is a percentage in [0, 100]
    Ai { is_ai: bool, confidence: f64 },
    /// NSFW verdict; score is in [0, 1]
    Nsfw {
        is_nsfw: bool,
        score: f64,
        category: NsfwCategory,
    },
}

/// Snapshot of quota usage, reported in every detection envelope
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub used: u32,
    pub remaining: u32,
    pub limit: u32,
}

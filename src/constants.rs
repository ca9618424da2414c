//! Application constants

/// Default endpoint for AI-or-Not image analysis
pub const AI_OR_NOT_IMAGE_API_URL: &str = "https://api.aiornot.com/v2/image/sync";

/// Default endpoint for AI-or-Not video analysis
pub const AI_OR_NOT_VIDEO_API_URL: &str = "https://api.aiornot.com/v2/video/sync";

/// Default endpoint for the NSFW moderation model
pub const NSFW_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// Maximum upload size for detection requests (200 MB)
pub const MAX_UPLOAD_SIZE: usize = 200 * 1024 * 1024;

/// Default number of vendor credits available per process
pub const DEFAULT_QUOTA_LIMIT: u32 = 10;

/// Cached verdicts expire after this many hours
pub const CACHE_TTL_HOURS: i64 = 24;

/// Expired entries are swept every Nth cache insertion
pub const CACHE_SWEEP_EVERY: u64 = 10;

/// Vendor timeout for the AI-generation API (seconds)
pub const AI_VENDOR_TIMEOUT_SECS: u64 = 60;

/// Vendor timeout for the NSFW moderation API (seconds)
pub const NSFW_VENDOR_TIMEOUT_SECS: u64 = 30;

/// Timeout when fetching a caller-supplied media_url (seconds)
pub const MEDIA_URL_FETCH_TIMEOUT_SECS: u64 = 20;

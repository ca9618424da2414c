//! Vendor response normalization
//!
//! Vendor contracts are not guaranteed: fields go missing, change type,
//! or move between report shapes. Both normalizers are pure functions
//! that degrade to a conservative default instead of failing the
//! request — a vendor hiccup should never turn into a 5xx.

use serde_json::{Map, Value};

use crate::models::{DetectionResult, NsfwCategory};

/// Keywords that flip the NSFW fallback verdict when the vendor's text
/// could not be parsed as JSON
const NSFW_KEYWORDS: [&str; 6] = ["nsfw", "true", "yes", "sexual", "nudity", "explicit"];

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Normalize an AI-or-Not style response into an AI-generation verdict.
///
/// Candidate objects are tried in priority order: `report.ai_generated`,
/// `report.ai_video`, then `report` itself. The first candidate carrying
/// a numeric confidence wins; a nested `ai.confidence` takes priority
/// over a flat `confidence`. Values above 1 are treated as percentages.
///
/// The reported confidence is the raw extracted value regardless of
/// which verdict branch produced it, matching the service's historical
/// behavior (a "human" verdict still reports the detector's confidence
/// as-is, not inverted).
///
/// If no candidate yields a usable confidence the result is
/// `(false, 0.0)` — fail-safe toward "not AI" rather than erroring.
pub fn normalize_ai_verdict(response: &Value) -> DetectionResult {
    let empty = Map::new();
    let report = response
        .get("report")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let candidates = [
        report.get("ai_generated").and_then(Value::as_object),
        report.get("ai_video").and_then(Value::as_object),
        Some(report),
    ];

    for candidate in candidates.into_iter().flatten() {
        let verdict = candidate
            .get("verdict")
            .and_then(Value::as_str)
            .map(str::to_lowercase)
            .unwrap_or_default();

        let nested_conf = candidate
            .get("ai")
            .and_then(Value::as_object)
            .and_then(|ai| ai.get("confidence"))
            .and_then(Value::as_f64);
        let flat_conf = candidate.get("confidence").and_then(Value::as_f64);

        let Some(mut conf) = nested_conf.or(flat_conf) else {
            continue;
        };

        if conf > 1.0 {
            conf /= 100.0;
        }
        let conf = conf.clamp(0.0, 1.0);

        let is_ai = match verdict.as_str() {
            "ai" => true,
            "human" => false,
            _ => conf >= 0.5,
        };

        return DetectionResult::Ai {
            is_ai,
            confidence: round2(conf * 100.0),
        };
    }

    DetectionResult::Ai {
        is_ai: false,
        confidence: 0.0,
    }
}

/// Normalize a generative-model moderation response into an NSFW verdict.
///
/// The vendor returns free-form text that is *expected* to contain a
/// JSON object `{is_nsfw, score, category}`, but the model does not
/// always comply. Extraction order:
/// 1. pull the text out of the candidates/content/parts envelope,
/// 2. brace-match an embedded JSON object, else parse the whole text,
/// 3. on total parse failure, fall back to keyword heuristics.
pub fn normalize_nsfw_verdict(response: &Value) -> DetectionResult {
    let Some(text) = extract_vendor_text(response) else {
        return nsfw_default();
    };

    let parsed = find_embedded_json(&text)
        .or_else(|| serde_json::from_str::<Value>(text.trim()).ok());

    let Some(parsed) = parsed else {
        return keyword_fallback(&text);
    };

    let Some(obj) = parsed.as_object() else {
        return nsfw_default();
    };

    let is_nsfw = coerce_is_nsfw(obj.get("is_nsfw"));

    let mut score = obj
        .get("score")
        .and_then(coerce_number)
        .unwrap_or(if is_nsfw { 0.8 } else { 0.2 });
    if score > 1.0 {
        score /= 100.0;
    }
    let score = round3(score.clamp(0.0, 1.0));

    let category = obj
        .get("category")
        .and_then(Value::as_str)
        .map(NsfwCategory::parse)
        .unwrap_or(NsfwCategory::Unknown);

    DetectionResult::Nsfw {
        is_nsfw,
        score,
        category,
    }
}

fn nsfw_default() -> DetectionResult {
    DetectionResult::Nsfw {
        is_nsfw: false,
        score: 0.0,
        category: NsfwCategory::Unknown,
    }
}

/// Walk the vendor's candidates/content/parts envelope and return the
/// first non-empty text part
fn extract_vendor_text(response: &Value) -> Option<String> {
    let candidates = response.get("candidates")?.as_array()?;
    for candidate in candidates {
        let Some(parts) = candidate
            .get("content")
            .and_then(|c| c.get("parts"))
            .and_then(Value::as_array)
        else {
            continue;
        };
        for part in parts {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                if !text.trim().is_empty() {
                    return Some(text.to_string());
                }
            }
        }
    }
    None
}

/// Locate the first balanced `{...}` span in the text and parse it.
///
/// Tracks string literals and escapes so braces inside JSON strings do
/// not unbalance the scan. Returns None if no span parses.
fn find_embedded_json(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut end = None;

        for (i, &b) in bytes.iter().enumerate().skip(start) {
            if escaped {
                escaped = false;
                continue;
            }
            match b {
                b'\\' if in_string => escaped = true,
                b'"' => in_string = !in_string,
                b'{' if !in_string => depth += 1,
                b'}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        match end {
            Some(end) => {
                if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                    return Some(value);
                }
                search_from = start + 1;
            }
            None => return None,
        }
    }

    None
}

/// Verdict from raw keyword scanning when the vendor text is not JSON
fn keyword_fallback(text: &str) -> DetectionResult {
    let lowered = text.to_lowercase();
    let is_nsfw = NSFW_KEYWORDS.iter().any(|kw| lowered.contains(kw));

    // Substring priority mirrors the moderation prompt's category order
    let category = if lowered.contains("sexual") {
        NsfwCategory::Sexual
    } else if lowered.contains("nudity") {
        NsfwCategory::Nudity
    } else if lowered.contains("suggestive") {
        NsfwCategory::Suggestive
    } else if lowered.contains("violence") {
        NsfwCategory::Violence
    } else {
        NsfwCategory::Unknown
    };

    DetectionResult::Nsfw {
        is_nsfw,
        score: if is_nsfw { 0.8 } else { 0.2 },
        category,
    }
}

/// Accept boolean or the string forms "true"/"yes"/"1"
fn coerce_is_nsfw(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.to_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}

/// Accept a JSON number or a numeric string
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

//! Best-effort JSON extraction from model text
//!
//! Models often wrap JSON in Markdown code fences or add a sentence around
//! it. Extraction tries the whole text, then a fenced block, then the
//! outermost `{...}` span.

use std::sync::OnceLock;

use regex::Regex;

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").ok())
        .as_ref()
}

/// Parse a JSON value out of raw model output
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(captures) = fence_regex().and_then(|re| re.captures(trimmed)) {
        if let Ok(value) = serde_json::from_str(&captures[1]) {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

/// Like [`extract_json`] but only accepts objects
pub fn extract_json_object(text: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    match extract_json(text)? {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}

//! Deterministic cache keys
//!
//! Keys are built from normalized request content so equivalent requests
//! share an entry.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub const CONTENT_PREFIX: &str = "content";
pub const ANALYSIS_PREFIX: &str = "analysis";

/// Characters of content kept verbatim in an analysis key
const ANALYSIS_FRAGMENT_CHARS: usize = 100;

/// Trim, lowercase and collapse internal whitespace runs
pub fn normalize_prompt(prompt: &str) -> String {
    prompt
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Key for a generation request
pub fn content_key(prompt: &str, temperature: f64, max_output_tokens: u32, model: &str) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        CONTENT_PREFIX,
        model,
        temperature,
        max_output_tokens,
        normalize_prompt(prompt)
    )
}

/// Key for an analysis request
///
/// The readable fragment is only the first characters of the content, so the
/// key also folds in the length and a hash of the full text. Two documents
/// sharing a long prefix do not collide.
pub fn analysis_key(content: &str, analysis_type: &str, model: &str) -> String {
    let fragment: String = content.trim().chars().take(ANALYSIS_FRAGMENT_CHARS).collect();
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!(
        "{}:{}:{}:{}:{}:{:016x}",
        ANALYSIS_PREFIX,
        analysis_type,
        model,
        content.len(),
        fragment,
        hasher.finish()
    )
}

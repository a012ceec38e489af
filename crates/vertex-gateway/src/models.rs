//! Static catalog of supported model ids

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::generation::DEFAULT_MODEL;

fn model_id_regex() -> Option<&'static Regex> {
    static MODEL_ID: OnceLock<Option<Regex>> = OnceLock::new();
    MODEL_ID
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._@-]*$").ok())
        .as_ref()
}

/// Model ids are a single URL path segment: no slashes, no query characters
pub fn is_valid_model_id(id: &str) -> bool {
    model_id_regex().is_some_and(|re| re.is_match(id))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub capabilities: &'static [&'static str],
    pub max_input_tokens: u32,
    pub max_output_tokens: u32,
    pub default: bool,
}

const CATALOG: [(&str, &str, &str, &[&str], u32, u32); 4] = [
    (
        "text-bison",
        "PaLM 2 for Text",
        "General text generation for marketing copy and analysis",
        &["text-generation", "content-analysis", "summarization"],
        8192,
        1024,
    ),
    (
        "chat-bison",
        "PaLM 2 for Chat",
        "Multi-turn conversational generation",
        &["chat", "text-generation"],
        8192,
        1024,
    ),
    (
        "code-bison",
        "Codey for Code Generation",
        "Code and markup generation such as landing page snippets",
        &["code-generation"],
        6144,
        1024,
    ),
    (
        "gemini-pro",
        "Gemini Pro",
        "Reasoning over longer marketing briefs and workflows",
        &["text-generation", "content-analysis", "reasoning", "workflow"],
        30720,
        8192,
    ),
];

/// Every model the gateway advertises
pub fn supported_models() -> Vec<ModelInfo> {
    CATALOG
        .iter()
        .map(
            |&(id, name, description, capabilities, max_input_tokens, max_output_tokens)| ModelInfo {
                id,
                name,
                description,
                capabilities,
                max_input_tokens,
                max_output_tokens,
                default: id == DEFAULT_MODEL,
            },
        )
        .collect()
}

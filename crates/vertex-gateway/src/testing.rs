//! Test doubles for the upstream model
//!
//! `ScriptedModel` answers predict calls from a list of rules matched against
//! the prompt text and records every prompt it sees.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::llm::{PredictRequest, PredictResponse, TextModel};

struct Rule {
    needle: String,
    reply: Result<String, UpstreamError>,
}

/// Model double that replies by prompt substring
pub struct ScriptedModel {
    rules: Vec<Rule>,
    default_reply: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    /// Every prompt without a matching rule gets `default_reply`
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default_reply: default_reply.into(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `text` when the prompt contains `needle`
    pub fn reply_when(mut self, needle: impl Into<String>, text: impl Into<String>) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            reply: Ok(text.into()),
        });
        self
    }

    /// Fail with `error` when the prompt contains `needle`
    pub fn fail_when(mut self, needle: impl Into<String>, error: UpstreamError) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            reply: Err(error),
        });
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    async fn predict(
        &self,
        _model: &str,
        request: &PredictRequest,
    ) -> Result<PredictResponse, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request
            .instances
            .first()
            .map(|i| i.prompt.clone())
            .unwrap_or_default();
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }

        let reply = self
            .rules
            .iter()
            .find(|rule| prompt.contains(&rule.needle))
            .map(|rule| rule.reply.clone())
            .unwrap_or_else(|| Ok(self.default_reply.clone()));

        reply.map(PredictResponse::from_content)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rules_and_default() {
        let model = ScriptedModel::new("default")
            .reply_when("coffee", "Brewed fresh")
            .fail_when("broken", UpstreamError::BadRequest("nope".to_string()));

        let ok = model
            .predict("m", &PredictRequest::new("a coffee tagline", 0.5, 10))
            .await
            .unwrap();
        assert_eq!(ok.text().unwrap(), "Brewed fresh");

        let fallback = model
            .predict("m", &PredictRequest::new("tea", 0.5, 10))
            .await
            .unwrap();
        assert_eq!(fallback.text().unwrap(), "default");

        let err = model
            .predict("m", &PredictRequest::new("broken prompt", 0.5, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::BadRequest(_)));

        assert_eq!(model.call_count(), 3);
        assert_eq!(model.prompts()[1], "tea");
    }
}

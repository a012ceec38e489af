//! Content generation, single prompt or batch

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::batch::{collect_outcomes, run_in_windows, BatchItemError, BATCH_CONCURRENCY};
use crate::cache::content_key;
use crate::error::GatewayError;
use crate::gateway::{Gateway, ModelParams};
use crate::models::is_valid_model_id;

pub const DEFAULT_MODEL: &str = "text-bison";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;
/// Upper bound accepted for `maxOutputTokens`
pub const MAX_OUTPUT_TOKENS_LIMIT: u32 = 8192;

/// Body of a generate request
///
/// `prompts` selects batch mode; otherwise `prompt` is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: Option<String>,
    pub prompts: Option<Vec<String>>,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
    pub model: Option<String>,
    pub use_caching: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    pub content: String,
    pub model: String,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGenerationResponse {
    /// False when any item failed
    pub success: bool,
    /// Aligned with the input; failed slots are empty strings
    pub results: Vec<String>,
    pub processed_count: usize,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<BatchItemError>,
    pub model: String,
    pub operation_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GenerationOutcome {
    Single(GenerationResponse),
    Batch(BatchGenerationResponse),
}

/// Validate and default the sampling parameters
pub(crate) fn resolve_params(
    model: Option<&str>,
    temperature: Option<f64>,
    max_output_tokens: Option<u32>,
    defaults: (f64, u32),
) -> Result<ModelParams, GatewayError> {
    let temperature = temperature.unwrap_or(defaults.0);
    if !(0.0..=1.0).contains(&temperature) {
        return Err(GatewayError::validation(format!(
            "temperature must be between 0 and 1, got {temperature}"
        )));
    }

    let max_output_tokens = max_output_tokens.unwrap_or(defaults.1);
    if max_output_tokens == 0 || max_output_tokens > MAX_OUTPUT_TOKENS_LIMIT {
        return Err(GatewayError::validation(format!(
            "maxOutputTokens must be between 1 and {MAX_OUTPUT_TOKENS_LIMIT}"
        )));
    }

    let model = model
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MODEL);
    if !is_valid_model_id(model) {
        return Err(GatewayError::validation(format!(
            "model '{model}' is not a valid model id"
        )));
    }

    Ok(ModelParams::new(model, temperature, max_output_tokens))
}

/// Message recorded for a failed batch item
pub(crate) fn item_error(error: GatewayError) -> String {
    match error {
        GatewayError::Upstream(message) => message,
        other => other.to_string(),
    }
}

pub struct GenerationService {
    gateway: Gateway,
}

impl GenerationService {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Dispatch on the request shape
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutcome, GatewayError> {
        self.gateway.settings.ensure_configured()?;

        let params = resolve_params(
            request.model.as_deref(),
            request.temperature,
            request.max_output_tokens,
            (DEFAULT_TEMPERATURE, DEFAULT_MAX_OUTPUT_TOKENS),
        )?;
        let use_cache = request.use_caching.unwrap_or(true);

        match (request.prompts, request.prompt) {
            (Some(prompts), _) => self
                .generate_batch(&prompts, &params, use_cache)
                .await
                .map(GenerationOutcome::Batch),
            (None, Some(prompt)) if !prompt.trim().is_empty() => self
                .generate_single(&prompt, &params, use_cache)
                .await
                .map(GenerationOutcome::Single),
            _ => Err(GatewayError::validation(
                "prompt is required and must be a non-empty string",
            )),
        }
    }

    pub async fn generate_single(
        &self,
        prompt: &str,
        params: &ModelParams,
        use_cache: bool,
    ) -> Result<GenerationResponse, GatewayError> {
        let (content, cached) = self.generate_one(prompt, params, use_cache).await?;
        Ok(GenerationResponse {
            success: true,
            content,
            model: params.model.clone(),
            cached,
        })
    }

    pub async fn generate_batch(
        &self,
        prompts: &[String],
        params: &ModelParams,
        use_cache: bool,
    ) -> Result<BatchGenerationResponse, GatewayError> {
        if prompts.is_empty() {
            return Err(GatewayError::validation("prompts must be a non-empty array"));
        }

        let handle = self.gateway.operations.start("generate", prompts.len()).await;
        debug!(operation_id = handle.id(), model = %params.model, total = prompts.len(), "Batch generation started");

        let outcomes = run_in_windows(prompts, BATCH_CONCURRENCY, Some(&handle), |index, prompt| async move {
            if prompt.trim().is_empty() {
                return Err(format!("prompt at index {index} is empty"));
            }
            self.generate_one(prompt, params, use_cache)
                .await
                .map(|(content, _)| content)
                .map_err(item_error)
        })
        .await;

        let (slots, errors) = collect_outcomes(outcomes);
        let processed_count = slots.iter().filter(|r| r.is_some()).count();
        let results: Vec<String> = slots.into_iter().map(Option::unwrap_or_default).collect();
        handle.finish(processed_count, errors.len()).await;

        info!(
            operation_id = handle.id(),
            processed = processed_count,
            failed = errors.len(),
            "Batch generation finished"
        );

        Ok(BatchGenerationResponse {
            success: errors.is_empty(),
            results,
            processed_count,
            total_count: prompts.len(),
            errors,
            model: params.model.clone(),
            operation_id: handle.id().to_string(),
        })
    }

    async fn generate_one(
        &self,
        prompt: &str,
        params: &ModelParams,
        use_cache: bool,
    ) -> Result<(String, bool), GatewayError> {
        let key = content_key(prompt, params.temperature, params.max_output_tokens, &params.model);
        let executed = self
            .gateway
            .complete(prompt, params, Some(&key), use_cache)
            .await
            .map_err(|failure| GatewayError::Upstream(failure.message))?;
        Ok((executed.value, executed.cached))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::error::UpstreamError;
    use crate::executor::RetryPolicy;
    use crate::settings::Settings;
    use crate::testing::ScriptedModel;
    use std::sync::Arc;

    fn gateway(model: Arc<ScriptedModel>) -> Gateway {
        Gateway::with_policy(
            Settings::new("token", "project", "us-central1"),
            model,
            Arc::new(MemoryCacheStore::new()),
            RetryPolicy::disabled(),
        )
    }

    fn single(outcome: GenerationOutcome) -> GenerationResponse {
        match outcome {
            GenerationOutcome::Single(r) => r,
            other => panic!("expected single response, got {other:?}"),
        }
    }

    fn batch(outcome: GenerationOutcome) -> BatchGenerationResponse {
        match outcome {
            GenerationOutcome::Batch(r) => r,
            other => panic!("expected batch response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_then_cached() {
        let model = Arc::new(ScriptedModel::new("Sip the sunrise."));
        let service = gateway(model.clone()).generation();
        let request = GenerationRequest {
            prompt: Some("Write a tagline for a coffee shop".to_string()),
            ..Default::default()
        };

        let first = single(service.generate(request.clone()).await.unwrap());
        assert!(first.success);
        assert!(!first.cached);
        assert_eq!(first.content, "Sip the sunrise.");
        assert_eq!(first.model, DEFAULT_MODEL);

        // Whitespace and case differences hit the same entry
        let again = GenerationRequest {
            prompt: Some("  write a tagline   for a COFFEE shop ".to_string()),
            ..Default::default()
        };
        let second = single(service.generate(again).await.unwrap());
        assert!(second.cached);
        assert_eq!(second.content, first.content);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_caching_can_be_disabled() {
        let model = Arc::new(ScriptedModel::new("text"));
        let service = gateway(model.clone()).generation();
        let request = GenerationRequest {
            prompt: Some("hello".to_string()),
            use_caching: Some(false),
            ..Default::default()
        };

        service.generate(request.clone()).await.unwrap();
        let second = single(service.generate(request).await.unwrap());
        assert!(!second.cached);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let model = Arc::new(
            ScriptedModel::new("ok").fail_when("poison", UpstreamError::BadRequest("blocked".to_string())),
        );
        let service = gateway(model).generation();
        let request = GenerationRequest {
            prompts: Some(vec![
                "one".to_string(),
                "poison pill".to_string(),
                "three".to_string(),
            ]),
            ..Default::default()
        };

        let response = batch(service.generate(request).await.unwrap());
        assert!(!response.success);
        assert_eq!(response.total_count, 3);
        assert_eq!(response.processed_count, 2);
        assert_eq!(response.results, vec!["ok", "", "ok"]);
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].index, 1);
        assert!(response.errors[0].error.contains("blocked"));
    }

    #[tokio::test]
    async fn test_batch_records_operation() {
        let model = Arc::new(ScriptedModel::new("ok"));
        let gateway = gateway(model);
        let request = GenerationRequest {
            prompts: Some(vec!["a".to_string(), "".to_string()]),
            ..Default::default()
        };

        let response = batch(gateway.generation().generate(request).await.unwrap());
        assert_eq!(response.errors[0].error, "prompt at index 1 is empty");

        let record = gateway.operations.get(&response.operation_id).await.unwrap();
        assert_eq!(record.total_count, 2);
        assert_eq!(record.processed_count, response.processed_count);
        assert_eq!(record.processed_count, 1);
        assert_eq!(record.failed_count, 1);
        assert!(!record.is_running());
    }

    /// Never answers, like an upstream that hangs
    struct StalledModel;

    #[async_trait::async_trait]
    impl crate::llm::TextModel for StalledModel {
        async fn predict(
            &self,
            _model: &str,
            _request: &crate::llm::PredictRequest,
        ) -> Result<crate::llm::PredictResponse, UpstreamError> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_cancelled_batch_does_not_stay_running() {
        let gateway = Gateway::with_policy(
            Settings::new("token", "project", "us-central1"),
            Arc::new(StalledModel),
            Arc::new(MemoryCacheStore::new()),
            RetryPolicy::disabled(),
        );
        let operations = gateway.operations.clone();

        for _ in 0..3 {
            let service = gateway.generation();
            let task = tokio::spawn(async move {
                service
                    .generate(GenerationRequest {
                        prompts: Some(vec!["a".to_string(), "b".to_string()]),
                        ..Default::default()
                    })
                    .await
            });
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            task.abort();
            assert!(task.await.unwrap_err().is_cancelled());
        }

        assert_eq!(operations.len().await, 3);
        assert_eq!(operations.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_validation() {
        let model = Arc::new(ScriptedModel::new("ok"));
        let service = gateway(model.clone()).generation();

        let missing = service.generate(GenerationRequest::default()).await;
        assert!(matches!(missing, Err(GatewayError::Validation(_))));

        let blank = service
            .generate(GenerationRequest {
                prompt: Some("   ".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(blank, Err(GatewayError::Validation(_))));

        let empty_batch = service
            .generate(GenerationRequest {
                prompts: Some(vec![]),
                ..Default::default()
            })
            .await;
        assert!(matches!(empty_batch, Err(GatewayError::Validation(_))));

        let hot = service
            .generate(GenerationRequest {
                prompt: Some("x".to_string()),
                temperature: Some(1.5),
                ..Default::default()
            })
            .await;
        assert!(matches!(hot, Err(GatewayError::Validation(_))));

        let traversal = service
            .generate(GenerationRequest {
                prompt: Some("x".to_string()),
                model: Some("../../v1/projects/other/endpoints/e?q=".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(traversal, Err(GatewayError::Validation(_))));

        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_not_configured() {
        let gateway = Gateway::new(
            Settings::default(),
            Arc::new(ScriptedModel::new("ok")),
            Arc::new(MemoryCacheStore::new()),
        );
        let result = gateway
            .generation()
            .generate(GenerationRequest {
                prompt: Some("x".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(GatewayError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_reported() {
        let model = Arc::new(ScriptedModel::new("ok").fail_when("x", UpstreamError::Unauthorized));
        let service = gateway(model).generation();
        let result = service
            .generate(GenerationRequest {
                prompt: Some("x".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(GatewayError::Upstream(_))));
    }
}

//! Shared service context
//!
//! `Gateway` bundles the pieces every service needs: settings, the model
//! backend, the cache, the executor and the operation tracker. It is cheap
//! to clone.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::analysis::AnalysisService;
use crate::cache::{CacheStore, MemoryCacheStore};
use crate::executor::{ExecutionFailure, Executed, RequestExecutor, RetryPolicy};
use crate::generation::GenerationService;
use crate::llm::{PredictRequest, TextModel, VertexClient};
use crate::operations::OperationTracker;
use crate::settings::Settings;
use crate::workflow::WorkflowService;

/// Model selection and sampling for one call
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl ModelParams {
    pub fn new(model: impl Into<String>, temperature: f64, max_output_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_output_tokens,
        }
    }
}

#[derive(Clone)]
pub struct Gateway {
    pub settings: Arc<Settings>,
    pub model: Arc<dyn TextModel>,
    pub cache: Arc<dyn CacheStore>,
    pub executor: Arc<RequestExecutor>,
    pub operations: Arc<OperationTracker>,
}

impl Gateway {
    pub fn new(settings: Settings, model: Arc<dyn TextModel>, cache: Arc<dyn CacheStore>) -> Self {
        Self::with_policy(settings, model, cache, RetryPolicy::default())
    }

    pub fn with_policy(
        settings: Settings,
        model: Arc<dyn TextModel>,
        cache: Arc<dyn CacheStore>,
        policy: RetryPolicy,
    ) -> Self {
        let executor = Arc::new(RequestExecutor::with_policy(Arc::clone(&cache), policy));
        Self {
            settings: Arc::new(settings),
            model,
            cache,
            executor,
            operations: Arc::new(OperationTracker::new()),
        }
    }

    /// Production wiring: Vertex client plus in-memory cache
    pub fn from_settings(settings: Settings, cache_ttl: Duration) -> Self {
        let shared = Arc::new(settings.clone());
        let model: Arc<dyn TextModel> = Arc::new(VertexClient::new(shared));
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::with_ttl(cache_ttl));
        Self::new(settings, model, cache)
    }

    /// Generate text for one prompt through the executor
    ///
    /// The cached value is the extracted text, so a response without any
    /// usable prediction is never stored.
    pub async fn complete(
        &self,
        prompt: &str,
        params: &ModelParams,
        cache_key: Option<&str>,
        use_cache: bool,
    ) -> Result<Executed<String>, ExecutionFailure> {
        let request = PredictRequest::new(prompt, params.temperature, params.max_output_tokens);
        let model = &self.model;
        debug!(
            provider = model.name(),
            model = %params.model,
            cache_key = cache_key.unwrap_or("-"),
            use_cache,
            "Completing prompt"
        );
        let model_name = params.model.as_str();
        let request = &request;

        self.executor
            .execute(
                move || async move { model.predict(model_name, request).await?.text() },
                cache_key,
                use_cache,
            )
            .await
    }

    pub fn generation(&self) -> GenerationService {
        GenerationService::new(self.clone())
    }

    pub fn analysis(&self) -> AnalysisService {
        AnalysisService::new(self.clone())
    }

    pub fn workflow(&self) -> WorkflowService {
        WorkflowService::new(self.clone())
    }
}

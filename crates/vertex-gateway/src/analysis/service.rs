use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{analysis_prompt, parse_analysis, AnalysisKind, AnalysisResult};
use crate::batch::{collect_outcomes, run_in_windows, BatchItemError, BATCH_CONCURRENCY};
use crate::cache::analysis_key;
use crate::error::GatewayError;
use crate::gateway::{Gateway, ModelParams};
use crate::generation::{item_error, resolve_params};

pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

/// Body of an analyze request
///
/// `contents` selects batch mode. Batch kinds come from `types` (one per
/// item) or a single `type` applied to every item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub content: Option<String>,
    pub contents: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub analysis_type: Option<String>,
    pub types: Option<Vec<String>>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
    pub use_caching: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub analysis: AnalysisResult,
    #[serde(rename = "type")]
    pub kind: AnalysisKind,
    pub model: String,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchAnalysisItem {
    #[serde(rename = "type")]
    pub kind: AnalysisKind,
    pub analysis: AnalysisResult,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAnalysisResponse {
    pub success: bool,
    /// Aligned with the input; failed slots are null
    pub results: Vec<Option<BatchAnalysisItem>>,
    pub processed_count: usize,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<BatchItemError>,
    pub model: String,
    pub operation_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Single(AnalysisResponse),
    Batch(BatchAnalysisResponse),
}

/// One analysis kind per content item
fn resolve_kinds(
    count: usize,
    analysis_type: Option<&str>,
    types: Option<&[String]>,
) -> Result<Vec<AnalysisKind>, GatewayError> {
    match (types, analysis_type) {
        (Some(types), _) => {
            if types.len() != count {
                return Err(GatewayError::validation(format!(
                    "types must have the same length as contents ({} != {count})",
                    types.len()
                )));
            }
            types.iter().map(|t| t.parse()).collect()
        }
        (None, Some(single)) => {
            let kind: AnalysisKind = single.parse()?;
            Ok(vec![kind; count])
        }
        (None, None) => Err(GatewayError::validation("type or types is required")),
    }
}

pub struct AnalysisService {
    gateway: Gateway,
}

impl AnalysisService {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome, GatewayError> {
        self.gateway.settings.ensure_configured()?;

        let params = resolve_params(
            request.model.as_deref(),
            request.temperature,
            request.max_output_tokens,
            (DEFAULT_TEMPERATURE, DEFAULT_MAX_OUTPUT_TOKENS),
        )?;
        let use_cache = request.use_caching.unwrap_or(true);

        if let Some(contents) = request.contents {
            if contents.is_empty() {
                return Err(GatewayError::validation("contents must be a non-empty array"));
            }
            let kinds = resolve_kinds(
                contents.len(),
                request.analysis_type.as_deref(),
                request.types.as_deref(),
            )?;
            return self
                .analyze_batch(&contents, &kinds, &params, use_cache)
                .await
                .map(AnalysisOutcome::Batch);
        }

        let content = request
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GatewayError::validation("content is required and must be a non-empty string"))?;
        let kind: AnalysisKind = request
            .analysis_type
            .as_deref()
            .ok_or_else(|| GatewayError::validation("type is required"))?
            .parse()?;

        let (analysis, cached) = self.analyze_one(&content, kind, &params, use_cache).await?;
        Ok(AnalysisOutcome::Single(AnalysisResponse {
            success: true,
            analysis,
            kind,
            model: params.model,
            cached,
        }))
    }

    pub async fn analyze_batch(
        &self,
        contents: &[String],
        kinds: &[AnalysisKind],
        params: &ModelParams,
        use_cache: bool,
    ) -> Result<BatchAnalysisResponse, GatewayError> {
        if contents.len() != kinds.len() {
            return Err(GatewayError::validation("each content item needs an analysis type"));
        }

        let handle = self.gateway.operations.start("analyze", contents.len()).await;
        debug!(operation_id = handle.id(), model = %params.model, total = contents.len(), "Batch analysis started");

        let outcomes = run_in_windows(contents, BATCH_CONCURRENCY, Some(&handle), |index, content| {
            let kind = kinds[index];
            async move {
                if content.trim().is_empty() {
                    return Err(format!("content at index {index} is empty"));
                }
                self.analyze_one(content, kind, params, use_cache)
                    .await
                    .map(|(analysis, cached)| BatchAnalysisItem {
                        kind,
                        analysis,
                        cached,
                    })
                    .map_err(item_error)
            }
        })
        .await;

        let (results, errors) = collect_outcomes(outcomes);
        let processed_count = results.iter().filter(|r| r.is_some()).count();
        handle.finish(processed_count, errors.len()).await;

        info!(
            operation_id = handle.id(),
            processed = processed_count,
            failed = errors.len(),
            "Batch analysis finished"
        );

        Ok(BatchAnalysisResponse {
            success: errors.is_empty(),
            results,
            processed_count,
            total_count: contents.len(),
            errors,
            model: params.model.clone(),
            operation_id: handle.id().to_string(),
        })
    }

    async fn analyze_one(
        &self,
        content: &str,
        kind: AnalysisKind,
        params: &ModelParams,
        use_cache: bool,
    ) -> Result<(AnalysisResult, bool), GatewayError> {
        let key = analysis_key(content, kind.as_str(), &params.model);
        let prompt = analysis_prompt(content, kind);
        let executed = self
            .gateway
            .complete(&prompt, params, Some(&key), use_cache)
            .await
            .map_err(|failure| GatewayError::Upstream(failure.message))?;

        Ok((parse_analysis(&executed.value, kind), executed.cached))
    }
}

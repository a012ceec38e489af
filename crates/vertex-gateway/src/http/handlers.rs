//! Service endpoints: generation, analysis and workflow execution

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use super::error::ApiError;
use super::AppState;
use crate::analysis::{AnalysisOutcome, AnalysisRequest};
use crate::generation::{GenerationOutcome, GenerationRequest};
use crate::workflow::{WorkflowRequest, WorkflowResponse};

pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationOutcome>, ApiError> {
    let Json(request) = payload?;
    let outcome = state.gateway.generation().generate(request).await?;
    Ok(Json(outcome))
}

pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    let Json(request) = payload?;
    let outcome = state.gateway.analysis().analyze(request).await?;
    Ok(Json(outcome))
}

pub async fn execute_workflow(
    State(state): State<AppState>,
    payload: Result<Json<WorkflowRequest>, JsonRejection>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let Json(request) = payload?;
    info!(
        nodes = request.workflow.nodes.len(),
        edges = request.workflow.edges.len(),
        "Executing workflow"
    );
    let response = state.gateway.workflow().execute(request).await?;
    Ok(Json(response))
}

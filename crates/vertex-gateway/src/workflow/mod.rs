//! Node/edge workflow execution
//!
//! # Overview
//!
//! A workflow document from the visual editor is a list of typed nodes and
//! directed edges. [`WorkflowEngine`] walks it breadth-first, asking the
//! model to perform each node's step and threading one accumulating JSON
//! state through the run.
//!
//! | Node type | Behavior |
//! |-----------|----------|
//! | `trigger` | pass-through, no model call |
//! | `agent`   | role-playing prompt with the full state |
//! | `data`    | extract and organize fields |
//! | `logic`   | routing decision |
//! | `output`  | final formatted deliverable |
//! | other     | generic process-the-state prompt |
//!
//! Cycles are not detected; the visited set bounds each node to one run.

mod engine;
mod graph;
mod prompts;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::generation::{resolve_params, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE};

pub use engine::{
    parse_node_output, NodeError, RunStatus, StateMap, WorkflowEngine, WorkflowError,
    WorkflowFailure, WorkflowRun,
};
pub use graph::{NodeData, NodeType, WorkflowDefinition, WorkflowEdge, WorkflowNode};
pub use prompts::node_prompt;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRequest {
    pub workflow: WorkflowDefinition,
    #[serde(default)]
    pub initial_state: Option<StateMap>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResponse {
    pub success: bool,
    #[serde(flatten)]
    pub run: WorkflowRun,
}

#[derive(Debug, Error)]
pub enum WorkflowExecuteError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Failed(#[from] WorkflowFailure),
}

pub struct WorkflowService {
    gateway: Gateway,
}

impl WorkflowService {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn execute(
        &self,
        request: WorkflowRequest,
    ) -> Result<WorkflowResponse, WorkflowExecuteError> {
        self.gateway.settings.ensure_configured()?;
        let params = resolve_params(
            request.model.as_deref(),
            request.temperature,
            request.max_output_tokens,
            (DEFAULT_TEMPERATURE, DEFAULT_MAX_OUTPUT_TOKENS),
        )?;

        let engine = WorkflowEngine::new(self.gateway.model.clone(), params);
        let run = engine
            .run(&request.workflow, request.initial_state.unwrap_or_default())
            .await?;

        Ok(WorkflowResponse { success: true, run })
    }
}

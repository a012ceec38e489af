//! Breadth-first workflow runner
//!
//! Execution starts from every node without an incoming edge and walks the
//! edges in FIFO order. Each node runs at most once: a join node fires on its
//! first arrival, which may come before all of its predecessors have run.
//!
//! Node outputs are shallow-merged into one running state object that later
//! nodes see in their prompts. A failing node is recorded and skipped over;
//! only a malformed graph aborts the run.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::graph::{WorkflowDefinition, WorkflowEdge, WorkflowNode};
use super::prompts::node_prompt;
use crate::error::UpstreamError;
use crate::gateway::ModelParams;
use crate::llm::{extract_json_object, PredictRequest, TextModel};

pub type StateMap = Map<String, Value>;

/// Graph problems that stop a run
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Workflow has no nodes")]
    Empty,

    #[error("Duplicate node id '{0}'")]
    DuplicateNode(String),

    /// Every node has an incoming edge, so there is nowhere to begin
    #[error("Workflow has no starting nodes: every node has an incoming edge")]
    NoStartNodes,

    #[error("Edge '{edge_id}' points to unknown node '{node_id}'")]
    UnknownNode { edge_id: String, node_id: String },
}

impl WorkflowError {
    /// Detected before any model call
    pub fn is_validation(&self) -> bool {
        !matches!(self, WorkflowError::UnknownNode { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    CompletedWithErrors,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::CompletedWithErrors => "completed_with_errors",
        }
    }
}

/// A node that failed; the run continued past it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeError {
    pub node_id: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a run that reached the end of the queue
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    pub status: RunStatus,
    pub final_state: StateMap,
    /// One entry per visited node
    pub node_results: StateMap,
    pub errors: Vec<NodeError>,
    pub nodes_processed: usize,
    /// Milliseconds
    pub execution_time: u64,
    pub unreachable_nodes: Vec<String>,
}

/// A run aborted by a graph problem, with whatever finished before it
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct WorkflowFailure {
    #[source]
    pub error: WorkflowError,
    pub node_results: StateMap,
    pub errors: Vec<NodeError>,
}

impl From<WorkflowError> for WorkflowFailure {
    fn from(error: WorkflowError) -> Self {
        Self {
            error,
            node_results: StateMap::new(),
            errors: Vec::new(),
        }
    }
}

/// Model output as a state patch
///
/// Anything that is not a JSON object becomes `{"rawOutput": text}`.
pub fn parse_node_output(text: &str) -> StateMap {
    extract_json_object(text).unwrap_or_else(|| {
        let mut raw = StateMap::new();
        raw.insert("rawOutput".to_string(), Value::String(text.to_string()));
        raw
    })
}

fn edge_label(edge: &WorkflowEdge) -> String {
    if edge.id.is_empty() {
        format!("{}->{}", edge.source, edge.target)
    } else {
        edge.id.clone()
    }
}

pub struct WorkflowEngine {
    model: Arc<dyn TextModel>,
    params: ModelParams,
}

impl WorkflowEngine {
    pub fn new(model: Arc<dyn TextModel>, params: ModelParams) -> Self {
        Self { model, params }
    }

    /// Run `workflow` to completion starting from `initial_state`
    pub async fn run(
        &self,
        workflow: &WorkflowDefinition,
        initial_state: StateMap,
    ) -> Result<WorkflowRun, WorkflowFailure> {
        workflow.validate()?;

        let started = Instant::now();
        let index = workflow.index();
        let mut queue: VecDeque<(String, Option<String>)> = workflow
            .start_nodes()
            .into_iter()
            .map(|node| (node.id.clone(), None))
            .collect();
        let mut visited: HashSet<String> = HashSet::new();
        let mut state = initial_state;
        let mut node_results = StateMap::new();
        let mut errors: Vec<NodeError> = Vec::new();

        info!(
            nodes = workflow.nodes.len(),
            edges = workflow.edges.len(),
            start_nodes = queue.len(),
            provider = self.model.name(),
            model = %self.params.model,
            "Workflow started"
        );

        while let Some((node_id, via_edge)) = queue.pop_front() {
            if visited.contains(&node_id) {
                continue;
            }

            let Some(node) = index.get(node_id.as_str()).copied() else {
                let error = WorkflowError::UnknownNode {
                    edge_id: via_edge.unwrap_or_default(),
                    node_id,
                };
                warn!(error = %error, "Workflow aborted");
                return Err(WorkflowFailure {
                    error,
                    node_results,
                    errors,
                });
            };
            visited.insert(node_id.clone());

            match node_prompt(node, &state) {
                None => {
                    debug!(node_id = %node.id, "Pass-through node");
                    node_results.insert(node.id.clone(), Value::Object(state.clone()));
                }
                Some(prompt) => match self.invoke(&prompt).await {
                    Ok(text) => {
                        let output = parse_node_output(&text);
                        Self::merge(&mut state, node, &output);
                        debug!(node_id = %node.id, fields = output.len(), "Node completed");
                        node_results.insert(node.id.clone(), Value::Object(output));
                    }
                    Err(e) => {
                        warn!(node_id = %node.id, error = %e, "Node failed");
                        node_results.insert(
                            node.id.clone(),
                            json!({ "error": e.to_string(), "status": "failed" }),
                        );
                        errors.push(NodeError {
                            node_id: node.id.clone(),
                            error: e.to_string(),
                            timestamp: Utc::now(),
                        });
                    }
                },
            }

            for edge in workflow.outgoing(&node.id) {
                if !visited.contains(&edge.target) {
                    queue.push_back((edge.target.clone(), Some(edge_label(edge))));
                }
            }
        }

        let unreachable_nodes: Vec<String> = workflow
            .nodes
            .iter()
            .filter(|n| !visited.contains(&n.id))
            .map(|n| n.id.clone())
            .collect();
        if !unreachable_nodes.is_empty() {
            warn!(nodes = ?unreachable_nodes, "Nodes not reachable from any start node");
        }

        let status = if errors.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithErrors
        };
        let execution_time = started.elapsed().as_millis() as u64;
        let nodes_processed = visited.len();

        state.insert("status".to_string(), json!(status.as_str()));
        state.insert("nodesProcessed".to_string(), json!(nodes_processed));
        state.insert("executionTime".to_string(), json!(execution_time));

        info!(
            status = status.as_str(),
            nodes_processed,
            failed = errors.len(),
            execution_time_ms = execution_time,
            "Workflow finished"
        );

        Ok(WorkflowRun {
            status,
            final_state: state,
            node_results,
            errors,
            nodes_processed,
            execution_time,
            unreachable_nodes,
        })
    }

    /// One direct model call, no cache and no retry
    async fn invoke(&self, prompt: &str) -> Result<String, UpstreamError> {
        let request = PredictRequest::new(
            prompt,
            self.params.temperature,
            self.params.max_output_tokens,
        );
        self.model.predict(&self.params.model, &request).await?.text()
    }

    fn merge(state: &mut StateMap, node: &WorkflowNode, output: &StateMap) {
        for (key, value) in output {
            state.insert(key.clone(), value.clone());
        }
        state.insert("lastNodeId".to_string(), json!(node.id));
        state.insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));
    }
}

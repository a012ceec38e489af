//! Workflow document: nodes and directed edges
//!
//! The document comes from the visual editor as JSON. Only the fields the
//! engine reads are modeled; layout fields such as `position` are ignored.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::engine::WorkflowError;

/// Role of a node; unknown strings are kept as [`NodeType::Other`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Agent,
    Trigger,
    Data,
    Logic,
    Output,
    Other(String),
}

impl From<String> for NodeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "agent" => NodeType::Agent,
            "trigger" => NodeType::Trigger,
            "data" => NodeType::Data,
            "logic" => NodeType::Logic,
            "output" => NodeType::Output,
            _ => NodeType::Other(value),
        }
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Agent => f.write_str("agent"),
            NodeType::Trigger => f.write_str("trigger"),
            NodeType::Data => f.write_str("data"),
            NodeType::Logic => f.write_str("logic"),
            NodeType::Output => f.write_str("output"),
            NodeType::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub data: NodeData,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            data: NodeData {
                label: label.into(),
                ..Default::default()
            },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.data.description = Some(description.into());
        self
    }

    /// Label for prompts, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.data.label.trim().is_empty() {
            &self.id
        } else {
            &self.data.label
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEdge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
}

impl WorkflowEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("{source}->{target}"),
            source,
            target,
        }
    }
}

/// Caller-supplied graph; the engine only reads it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

impl WorkflowDefinition {
    pub fn new(nodes: Vec<WorkflowNode>, edges: Vec<WorkflowEdge>) -> Self {
        Self { nodes, edges }
    }

    /// Nodes with no incoming edge, in document order
    pub fn start_nodes(&self) -> Vec<&WorkflowNode> {
        let targets: HashSet<&str> = self.edges.iter().map(|e| e.target.as_str()).collect();
        self.nodes
            .iter()
            .filter(|n| !targets.contains(n.id.as_str()))
            .collect()
    }

    /// Edges leaving `node_id`, in document order
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a WorkflowEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Node lookup by id
    pub fn index(&self) -> HashMap<&str, &WorkflowNode> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    /// Checks that must pass before any model call
    ///
    /// Dangling edge endpoints are not checked here; the engine reports them
    /// when traversal first reaches one.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.nodes.is_empty() {
            return Err(WorkflowError::Empty);
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(WorkflowError::DuplicateNode(node.id.clone()));
            }
        }

        if self.start_nodes().is_empty() {
            return Err(WorkflowError::NoStartNodes);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_editor_document() {
        let doc: WorkflowDefinition = serde_json::from_value(json!({
            "nodes": [
                {"id": "1", "type": "trigger", "data": {"label": "Start"}, "position": {"x": 0, "y": 0}},
                {"id": "2", "type": "agent", "data": {"label": "Writer", "agentType": "copywriter"}},
                {"id": "3", "type": "webhook", "data": {}}
            ],
            "edges": [{"id": "e1-2", "source": "1", "target": "2"}, {"source": "2", "target": "3"}]
        }))
        .unwrap();

        assert_eq!(doc.nodes[0].node_type, NodeType::Trigger);
        assert_eq!(doc.nodes[1].data.agent_type.as_deref(), Some("copywriter"));
        assert_eq!(doc.nodes[2].node_type, NodeType::Other("webhook".to_string()));
        assert_eq!(doc.nodes[2].display_name(), "3");
        assert_eq!(doc.edges[1].id, "");
    }

    #[test]
    fn test_node_type_round_trips_unknown_names() {
        let value = serde_json::to_value(NodeType::Other("webhook".to_string())).unwrap();
        assert_eq!(value, json!("webhook"));
        assert_eq!(serde_json::to_value(NodeType::Logic).unwrap(), json!("logic"));
    }

    #[test]
    fn test_start_nodes_and_outgoing() {
        let doc = WorkflowDefinition::new(
            vec![
                WorkflowNode::new("a", NodeType::Trigger, "A"),
                WorkflowNode::new("b", NodeType::Agent, "B"),
                WorkflowNode::new("c", NodeType::Agent, "C"),
            ],
            vec![WorkflowEdge::new("a", "b"), WorkflowEdge::new("a", "c")],
        );

        let starts: Vec<_> = doc.start_nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(starts, vec!["a"]);
        let targets: Vec<_> = doc.outgoing("a").map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["b", "c"]);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(WorkflowDefinition::default().validate(), Err(WorkflowError::Empty)));

        let cycle = WorkflowDefinition::new(
            vec![
                WorkflowNode::new("a", NodeType::Agent, "A"),
                WorkflowNode::new("b", NodeType::Agent, "B"),
            ],
            vec![WorkflowEdge::new("a", "b"), WorkflowEdge::new("b", "a")],
        );
        assert!(matches!(cycle.validate(), Err(WorkflowError::NoStartNodes)));

        let duplicate = WorkflowDefinition::new(
            vec![
                WorkflowNode::new("a", NodeType::Agent, "A"),
                WorkflowNode::new("a", NodeType::Data, "A again"),
            ],
            vec![],
        );
        assert!(matches!(duplicate.validate(), Err(WorkflowError::DuplicateNode(id)) if id == "a"));
    }
}

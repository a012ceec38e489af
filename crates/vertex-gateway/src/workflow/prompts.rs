//! Per-node-type prompt templates

use serde_json::{Map, Value};

use super::graph::{NodeType, WorkflowNode};

/// Prompt for `node` given the running state; `None` for pass-through nodes
pub fn node_prompt(node: &WorkflowNode, state: &Map<String, Value>) -> Option<String> {
    let state_json =
        serde_json::to_string_pretty(state).unwrap_or_else(|_| "{}".to_string());
    let name = node.display_name();
    let description = node.data.description.as_deref().unwrap_or("");

    let prompt = match &node.node_type {
        NodeType::Trigger => return None,
        NodeType::Agent => {
            let specialty = node
                .data
                .agent_type
                .as_deref()
                .unwrap_or("marketing specialist");
            format!(
                "You are {name}, an AI {specialty} in a marketing automation workflow.\n\
                 Your task: {description}\n\n\
                 Current workflow state:\n{state_json}\n\n\
                 Do your part of the work and respond with a JSON object of the fields you produce."
            )
        }
        NodeType::Data => format!(
            "You are the data step \"{name}\" in a marketing workflow. {description}\n\n\
             Extract and organize the relevant fields from this state:\n{state_json}\n\n\
             Respond with a JSON object of the organized data."
        ),
        NodeType::Logic => format!(
            "You are the decision step \"{name}\" in a marketing workflow. {description}\n\n\
             Current state:\n{state_json}\n\n\
             Decide which path the workflow should take and respond with a JSON object \
             like {{\"decision\": \"<route>\", \"reason\": \"<why>\"}}."
        ),
        NodeType::Output => format!(
            "You are the final output step \"{name}\" in a marketing workflow. {description}\n\n\
             Using everything gathered so far:\n{state_json}\n\n\
             Produce the final formatted deliverable as a JSON object with an \"output\" field."
        ),
        NodeType::Other(kind) => format!(
            "You are the \"{name}\" step ({kind}) in a marketing workflow. {description}\n\n\
             Current state:\n{state_json}\n\n\
             Process the state and respond with a JSON object of your results."
        ),
    };

    Some(prompt)
}

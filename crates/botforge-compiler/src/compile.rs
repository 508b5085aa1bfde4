use tracing::debug;

use botforge_core::definition::{AgentDefinition, Edge};
use botforge_core::step::CompiledStep;

use crate::address::StepAddressMap;
use crate::ai::ai_takeover;
use crate::content::message_content;
use crate::next::next_possible_steps;
use crate::registry::message_type_for;

/// Compile a raw agent definition into its ordered step script.
///
/// Emits exactly one `CompiledStep` per non-start node, in node-array
/// order. Pure and deterministic: compiling the same definition twice
/// yields identical output. Callers are expected to skip compilation when
/// either the node or connection array is empty; handed one anyway, this
/// simply compiles whatever is present.
pub fn compile(definition: &AgentDefinition) -> Vec<CompiledStep> {
    let addresses = StepAddressMap::assign(&definition.nodes);
    debug!(
        nodes = definition.nodes.len(),
        connections = definition.connections.len(),
        steps = addresses.len(),
        "compiling agent definition"
    );

    definition
        .nodes
        .iter()
        .filter(|node| !node.kind.is_start())
        .map(|node| {
            let outgoing: Vec<&Edge> = definition
                .connections
                .iter()
                .filter(|edge| edge.source == node.id)
                .collect();

            let (enable_ai_takeover, ai_config) = ai_takeover(&node.data);

            CompiledStep {
                // Every non-start node has an address by construction.
                step: addresses.get(&node.id).unwrap_or_default().to_string(),
                step_name: node
                    .data
                    .step_name
                    .clone()
                    .or_else(|| node.data.label.clone())
                    .unwrap_or_default(),
                variable: node.data.variable.clone().unwrap_or_default(),
                mandatory: node.data.mandatory,
                check_post: node.data.check_post,
                purpose: node.data.purpose.clone().unwrap_or_default(),
                enable_ai_takeover,
                regex: node.data.regex.clone().unwrap_or_default(),
                next_possible_steps: next_possible_steps(&outgoing, &addresses),
                type_of_message: message_type_for(node.kind),
                message_content: message_content(node, &outgoing, &addresses),
                media_items: node.data.media_items.clone(),
                ai_config,
            }
        })
        .collect()
}

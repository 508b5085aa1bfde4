use botforge_core::definition::{Edge, Node};
use botforge_core::step::{ReplyOption, STOP_STEP};

use crate::address::StepAddressMap;

/// Resolve option `index` of a node to its reply payload.
///
/// This is the only place where option position and edge handle are
/// correlated: the edge whose `sourceHandle` equals `handle-{index}` wires
/// the option to its target step, and the postback text becomes
/// `"{targetStep}/{label}"`. Without a matching edge the node's own step id
/// is used instead, and `"stop"` stands in wherever no step id resolves.
pub fn resolve_option(
    node: &Node,
    index: usize,
    label: &str,
    outgoing: &[&Edge],
    addresses: &StepAddressMap,
) -> ReplyOption {
    let handle = Edge::handle_for(index);
    let matched = outgoing
        .iter()
        .find(|edge| edge.source_handle.as_deref() == Some(handle.as_str()));

    let step = match matched {
        Some(edge) => addresses.get(&edge.target).unwrap_or(STOP_STEP),
        None => addresses.get(&node.id).unwrap_or(STOP_STEP),
    };

    ReplyOption::text(label, format!("{step}/{label}"))
}

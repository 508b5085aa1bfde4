use botforge_core::definition::Edge;
use botforge_core::step::STOP_STEP;

use crate::address::StepAddressMap;

/// The ordered list of reachable next steps for a node.
///
/// Edge-array order is preserved with no sorting or dedup. A node with no
/// outgoing edges always resolves to `["stop"]`, and any edge whose target
/// has no assigned step (dangling target, or the start node) contributes a
/// `"stop"` entry in its position.
pub fn next_possible_steps(outgoing: &[&Edge], addresses: &StepAddressMap) -> Vec<String> {
    if outgoing.is_empty() {
        return vec![STOP_STEP.to_string()];
    }

    outgoing
        .iter()
        .map(|edge| {
            addresses
                .get(&edge.target)
                .unwrap_or(STOP_STEP)
                .to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use botforge_core::definition::{Node, NodeData, NodeKind};

    fn nodes() -> Vec<Node> {
        ["a", "b", "c"]
            .iter()
            .map(|id| Node {
                id: id.to_string(),
                kind: NodeKind::Message,
                data: NodeData::default(),
            })
            .collect()
    }

    fn edge(source: &str, target: &str) -> Edge {
        Edge {
            source: source.into(),
            target: target.into(),
            source_handle: None,
        }
    }

    #[test]
    fn no_outgoing_edges_resolves_to_stop() {
        let addresses = StepAddressMap::assign(&nodes());
        assert_eq!(next_possible_steps(&[], &addresses), vec!["stop"]);
    }

    #[test]
    fn targets_resolve_in_edge_order() {
        let addresses = StepAddressMap::assign(&nodes());
        let e1 = edge("a", "c");
        let e2 = edge("a", "b");
        let next = next_possible_steps(&[&e1, &e2], &addresses);
        assert_eq!(next, vec!["step2", "step1"]);
    }

    #[test]
    fn dangling_target_resolves_to_stop() {
        let addresses = StepAddressMap::assign(&nodes());
        let e1 = edge("a", "b");
        let e2 = edge("a", "missing");
        let next = next_possible_steps(&[&e1, &e2], &addresses);
        assert_eq!(next, vec!["step1", "stop"]);
    }

    #[test]
    fn duplicate_targets_are_kept() {
        let addresses = StepAddressMap::assign(&nodes());
        let e1 = edge("a", "b");
        let e2 = edge("a", "b");
        let next = next_possible_steps(&[&e1, &e2], &addresses);
        assert_eq!(next, vec!["step1", "step1"]);
    }
}

use std::collections::HashMap;

use botforge_core::definition::Node;

/// Step identifiers for every non-start node of a definition.
///
/// Identifiers are handed out in node-array order (`step0`, `step1`, ...),
/// not in graph-reachability order. Existing scripts and postback payloads
/// address steps by these ids, so the assignment order is part of the
/// compatibility contract and must not be changed.
#[derive(Debug, Default)]
pub struct StepAddressMap {
    by_node: HashMap<String, String>,
}

impl StepAddressMap {
    /// Assign identifiers for one compile pass. The start node gets none.
    pub fn assign(nodes: &[Node]) -> Self {
        let by_node = nodes
            .iter()
            .filter(|node| !node.kind.is_start())
            .enumerate()
            .map(|(i, node)| (node.id.clone(), format!("step{i}")))
            .collect();
        Self { by_node }
    }

    /// The step identifier assigned to `node_id`, if any.
    pub fn get(&self, node_id: &str) -> Option<&str> {
        self.by_node.get(node_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botforge_core::definition::{NodeData, NodeKind};

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.into(),
            kind,
            data: NodeData::default(),
        }
    }

    #[test]
    fn assigns_in_array_order_skipping_start() {
        let nodes = vec![
            node("a", NodeKind::Message),
            node("s", NodeKind::Start),
            node("b", NodeKind::Question),
            node("c", NodeKind::Buttons),
        ];
        let map = StepAddressMap::assign(&nodes);

        assert_eq!(map.get("a"), Some("step0"));
        assert_eq!(map.get("b"), Some("step1"));
        assert_eq!(map.get("c"), Some("step2"));
        assert_eq!(map.get("s"), None);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn identifiers_are_unique() {
        let nodes: Vec<Node> = (0..50)
            .map(|i| node(&format!("n{i}"), NodeKind::Message))
            .collect();
        let map = StepAddressMap::assign(&nodes);

        let mut seen = std::collections::HashSet::new();
        for n in &nodes {
            assert!(seen.insert(map.get(&n.id).unwrap().to_string()));
        }
        assert_eq!(seen.len(), 50);
    }

    #[test]
    fn empty_input_yields_empty_map() {
        let map = StepAddressMap::assign(&[]);
        assert!(map.is_empty());
    }
}

use serde::{Deserialize, Serialize};

/// A raw agent definition as authored in the visual graph editor.
///
/// This is the author-facing form; the compiled step script derived from it
/// is the system of record for execution. Field names and casing follow the
/// editor's wire format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentDefinition {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Edge>,
}

impl AgentDefinition {
    /// Whether this definition carries anything worth compiling.
    ///
    /// Both arrays must be non-empty; compiling an empty definition is a
    /// no-op for callers, not an error.
    pub fn is_compilable(&self) -> bool {
        !self.nodes.is_empty() && !self.connections.is_empty()
    }
}

/// One vertex of the author-facing graph, typed by interaction kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Editor-assigned node id, referenced by edges.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub data: NodeData,
}

/// Interaction kind of a node.
///
/// The variant set is closed: anything the editor sends that this version
/// does not recognize lands on `Unknown`, and downstream dispatch is an
/// exhaustive match, so adding a node type is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    Message,
    Question,
    List,
    Buttons,
    #[serde(other)]
    Unknown,
}

impl NodeKind {
    pub fn is_start(&self) -> bool {
        matches!(self, NodeKind::Start)
    }
}

/// Type-dependent node payload.
///
/// The editor serializes one bag of fields per node; which ones are
/// meaningful depends on the node kind (message nodes carry `text`,
/// question nodes carry `question` + `options`, and so on). Everything is
/// defaulted so partial payloads parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeData {
    pub label: Option<String>,
    pub step_name: Option<String>,
    /// Body text for message and buttons nodes.
    pub text: Option<String>,
    /// Prompt text for question nodes.
    pub question: Option<String>,
    /// Header title for list nodes.
    pub title: Option<String>,
    /// Body text for list nodes.
    pub body: Option<String>,
    /// Selectable options for question nodes, in display order.
    pub options: Vec<String>,
    /// Button labels for buttons nodes, in display order.
    pub buttons: Vec<String>,
    /// Sections for list nodes.
    pub items: Vec<ListItem>,
    /// Variable name the runtime stores the reply under.
    pub variable: Option<String>,
    pub mandatory: bool,
    pub check_post: bool,
    pub purpose: Option<String>,
    /// Validation pattern applied to the reply by the runtime.
    pub regex: Option<String>,
    #[serde(rename = "enableAITakeover")]
    pub enable_ai_takeover: bool,
    pub ai_config: Option<AiConfig>,
    pub media_items: Vec<MediaItem>,
}

/// One section of a list node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListItem {
    pub title: String,
    pub options: Vec<String>,
}

/// A media attachment, projected down to the three fields the runtime uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub name: String,
}

/// Per-step AI takeover settings.
///
/// `Clone` gives value semantics: a compiled step's config never aliases
/// the node's original payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiConfig {
    pub ai_provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub context_input: String,
    pub system_prompt: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            ai_provider: "gpt".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            context_input: String::new(),
            system_prompt: String::new(),
        }
    }
}

/// A directed link between two nodes.
///
/// `sourceHandle` values of the form `handle-{i}` tie an edge to the i-th
/// option or button of its source node; this is the wire contract with the
/// graph editor and must be preserved exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub source_handle: Option<String>,
}

impl Edge {
    /// The `sourceHandle` value linking option `index` of a node to an edge.
    pub fn handle_for(index: usize) -> String {
        format!("handle-{index}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_editor_wire_format() {
        let json = r#"{
            "nodes": [
                {"id": "n1", "type": "start", "data": {"label": "Start"}},
                {"id": "n2", "type": "question", "data": {
                    "question": "Coffee or tea?",
                    "options": ["coffee", "tea"],
                    "stepName": "drink_choice",
                    "variable": "drink",
                    "mandatory": true,
                    "enableAITakeover": true,
                    "aiConfig": {"aiProvider": "gpt", "model": "gpt-4", "maxTokens": 500, "temperature": 0.2}
                }}
            ],
            "connections": [
                {"source": "n1", "target": "n2", "sourceHandle": "handle-0"}
            ]
        }"#;

        let def: AgentDefinition = serde_json::from_str(json).unwrap();
        assert!(def.is_compilable());
        assert_eq!(def.nodes.len(), 2);
        assert!(def.nodes[0].kind.is_start());

        let q = &def.nodes[1];
        assert_eq!(q.kind, NodeKind::Question);
        assert_eq!(q.data.options, vec!["coffee", "tea"]);
        assert_eq!(q.data.step_name.as_deref(), Some("drink_choice"));
        assert!(q.data.mandatory);
        assert!(q.data.enable_ai_takeover);

        let cfg = q.data.ai_config.as_ref().unwrap();
        assert_eq!(cfg.model, "gpt-4");
        assert_eq!(cfg.max_tokens, 500);
        // Fields the editor omitted fall back to defaults
        assert_eq!(cfg.context_input, "");

        assert_eq!(def.connections[0].source_handle.as_deref(), Some("handle-0"));
    }

    #[test]
    fn unrecognized_node_type_is_unknown() {
        let json = r#"{"id": "n9", "type": "carousel", "data": {}}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.kind, NodeKind::Unknown);
    }

    #[test]
    fn node_without_data_parses() {
        let json = r#"{"id": "n1", "type": "message"}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.kind, NodeKind::Message);
        assert!(node.data.text.is_none());
        assert!(!node.data.mandatory);
    }

    #[test]
    fn empty_definition_is_not_compilable() {
        let def = AgentDefinition::default();
        assert!(!def.is_compilable());

        let json = r#"{"nodes": [{"id": "n1", "type": "start"}], "connections": []}"#;
        let def: AgentDefinition = serde_json::from_str(json).unwrap();
        assert!(!def.is_compilable());
    }

    #[test]
    fn media_item_drops_extra_fields() {
        let json = r#"{"type": "image", "url": "https://x/y.png", "name": "y", "sizeBytes": 1234}"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind, "image");
        assert_eq!(item.url, "https://x/y.png");
        assert_eq!(item.name, "y");
    }

    #[test]
    fn default_ai_config_values() {
        let cfg = AiConfig::default();
        assert_eq!(cfg.ai_provider, "gpt");
        assert_eq!(cfg.model, "gpt-3.5-turbo");
        assert_eq!(cfg.max_tokens, 2000);
        assert_eq!(cfg.temperature, 0.7);
        assert_eq!(cfg.context_input, "");
        assert_eq!(cfg.system_prompt, "");
    }

    #[test]
    fn edge_handle_convention() {
        assert_eq!(Edge::handle_for(0), "handle-0");
        assert_eq!(Edge::handle_for(7), "handle-7");
    }
}

//! End-to-end: editor JSON in, persisted step script out.

use botforge_core::definition::AgentDefinition;
use botforge_core::step::MessageContent;
use botforge_core::NewAgent;
use botforge_store::AgentStore;

const EDITOR_JSON: &str = r#"{
    "nodes": [
        {"id": "node-start", "type": "start", "data": {"label": "Start"}},
        {"id": "node-a", "type": "message", "data": {
            "text": "Thanks, you are all set.",
            "stepName": "confirmation",
            "mediaItems": [{"type": "image", "url": "https://cdn/ok.png", "name": "ok", "width": 300}]
        }},
        {"id": "node-b", "type": "question", "data": {
            "question": "Do you want to proceed?",
            "options": ["yes", "no"],
            "variable": "consent",
            "mandatory": true,
            "enableAITakeover": true
        }}
    ],
    "connections": [
        {"source": "node-start", "target": "node-b", "sourceHandle": "handle-0"},
        {"source": "node-b", "target": "node-a", "sourceHandle": "handle-0"}
    ]
}"#;

#[test]
fn editor_json_compiles_and_persists() {
    let definition: AgentDefinition = serde_json::from_str(EDITOR_JSON).expect("parse definition");
    assert!(definition.is_compilable());

    let store = AgentStore::in_memory().expect("open store");
    let agent = store
        .create_agent(
            NewAgent {
                name: "onboarding".into(),
                agent_definition: Some(definition),
                ..Default::default()
            },
            "biz-1",
            "author",
        )
        .expect("create agent");

    let steps = store
        .get_agent_steps(&agent.id, "biz-1", None)
        .expect("load steps");

    // Two non-start nodes, two steps, distinct ids
    assert_eq!(steps.len(), 2);
    assert_ne!(steps[0].step, steps[1].step);

    // node-a: sink message with projected media
    let a = &steps[0];
    assert_eq!(a.step, "step0");
    assert_eq!(a.step_name, "confirmation");
    assert_eq!(a.next_possible_steps, vec!["stop"]);
    assert_eq!(a.media_items.len(), 1);
    assert_eq!(a.media_items[0].name, "ok");
    assert!(a.ai_config.is_none());

    // node-b: question wired to node-a on "yes", unwired "no" falls back
    let b = &steps[1];
    assert_eq!(b.step, "step1");
    assert_eq!(b.variable, "consent");
    assert!(b.mandatory);
    assert_eq!(b.next_possible_steps, vec!["step0"]);
    match &b.message_content {
        MessageContent::QuickReply { options, .. } => {
            assert_eq!(options[0].postback_text, "step0/yes");
            assert_eq!(options[1].postback_text, "step1/no");
        }
        other => panic!("expected quick reply, got {other:?}"),
    }

    // AI takeover was enabled without a config: the default applies
    assert!(b.enable_ai_takeover);
    let cfg = b.ai_config.as_ref().expect("default ai config");
    assert_eq!(cfg.ai_provider, "gpt");
    assert_eq!(cfg.model, "gpt-3.5-turbo");
    assert_eq!(cfg.max_tokens, 2000);
}

#[test]
fn compiled_output_is_deterministic() {
    let definition: AgentDefinition = serde_json::from_str(EDITOR_JSON).unwrap();
    let first = serde_json::to_string(&botforge_compiler::compile(&definition)).unwrap();
    let second = serde_json::to_string(&botforge_compiler::compile(&definition)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn step_documents_use_the_wire_field_names() {
    let definition: AgentDefinition = serde_json::from_str(EDITOR_JSON).unwrap();
    let steps = botforge_compiler::compile(&definition);
    let value = serde_json::to_value(&steps[1]).unwrap();

    for field in [
        "step",
        "step_name",
        "variable",
        "mandatory",
        "check_post",
        "purpose",
        "enable_ai_takeover",
        "regex",
        "next_possible_steps",
        "type_of_message",
        "message_content",
        "media_items",
        "ai_config",
    ] {
        assert!(value.get(field).is_some(), "missing field {field}");
    }
    assert_eq!(value["type_of_message"], "quick_reply");
    assert_eq!(value["message_content"]["type"], "quick_reply");
    assert_eq!(
        value["message_content"]["options"][0]["postbackText"],
        "step0/yes"
    );
}

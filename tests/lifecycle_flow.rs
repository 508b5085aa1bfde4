//! Full lifecycle walk: draft → review → approval → activation, plus
//! versioning and cloning, against an on-disk store.

use botforge_core::agent::{AgentPatch, AgentStatus, CloneRequest, NewAgent};
use botforge_core::error::BotforgeError;
use botforge_store::AgentStore;

fn store() -> (tempfile::TempDir, AgentStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = AgentStore::open(&dir.path().join("agents.db")).expect("open store");
    (dir, store)
}

#[test]
fn draft_to_active_walk() {
    let (_dir, store) = store();
    let agent = store
        .create_agent(
            NewAgent {
                name: "faq-bot".into(),
                ..Default::default()
            },
            "biz",
            "author",
        )
        .unwrap();
    assert_eq!(agent.status, AgentStatus::Draft);

    // Cannot activate or approve a draft
    assert!(matches!(
        store.toggle_agent_status(&agent.id, "biz", true),
        Err(BotforgeError::BadRequest(_))
    ));
    assert!(matches!(
        store.approve_agent(&agent.id, "biz", "reviewer"),
        Err(BotforgeError::BadRequest(_))
    ));

    store.submit_agent(&agent.id, "biz").unwrap();
    store.approve_agent(&agent.id, "biz", "reviewer").unwrap();
    let active = store.toggle_agent_status(&agent.id, "biz", true).unwrap();
    assert!(active.is_active);
}

#[test]
fn rejected_version_is_replaced_by_a_new_draft() {
    let (_dir, store) = store();
    let v1 = store
        .create_agent(
            NewAgent {
                name: "sales-bot".into(),
                ..Default::default()
            },
            "biz",
            "author",
        )
        .unwrap();

    store.submit_agent(&v1.id, "biz").unwrap();
    store.reject_agent(&v1.id, "biz", "needs a fallback step").unwrap();

    // rejected is terminal; the way forward is a new version
    assert!(matches!(
        store.submit_agent(&v1.id, "biz"),
        Err(BotforgeError::BadRequest(_))
    ));

    let v2 = store
        .update_agent(
            &v1.id,
            AgentPatch {
                description: Some("now with fallback".into()),
                ..Default::default()
            },
            "biz",
            true,
        )
        .unwrap();
    assert_eq!(v2.version, 2);
    assert_eq!(v2.status, AgentStatus::Draft);

    store.submit_agent(&v2.id, "biz").unwrap();
    store.approve_agent(&v2.id, "biz", "reviewer").unwrap();

    // Both versions visible, each with its own row
    let agents = store.list_agents("biz").unwrap();
    assert_eq!(agents.len(), 2);
}

#[test]
fn clone_is_independent_of_its_source() {
    let (_dir, store) = store();
    let source = store
        .create_agent(
            NewAgent {
                name: "original".into(),
                ai_character: Some("formal".into()),
                global_rules: Some("never guess".into()),
                ..Default::default()
            },
            "biz",
            "author",
        )
        .unwrap();

    let copy = store
        .clone_agent(
            &source.id,
            CloneRequest {
                name: "copy".into(),
                copy_ai_character: false,
                copy_global_rules: true,
                ..Default::default()
            },
            "biz",
            "someone-else",
        )
        .unwrap();

    assert_eq!(copy.version, 1);
    assert!(copy.ai_character.is_none());
    assert_eq!(copy.global_rules.as_deref(), Some("never guess"));

    // Deleting the copy leaves the source alone
    store.delete_agent(&copy.id, "biz").unwrap();
    assert!(store.get_agent(&source.id, "biz").is_ok());
}

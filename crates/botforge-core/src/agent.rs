use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::definition::AgentDefinition;
use crate::error::{BotforgeError, Result};

/// Lifecycle status of an agent.
///
/// Transitions: draft → pending_approval → approved | rejected. `rejected`
/// is terminal; the path back into review is a fresh draft version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Draft => "draft",
            AgentStatus::PendingApproval => "pending_approval",
            AgentStatus::Approved => "approved",
            AgentStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(AgentStatus::Draft),
            "pending_approval" => Ok(AgentStatus::PendingApproval),
            "approved" => Ok(AgentStatus::Approved),
            "rejected" => Ok(AgentStatus::Rejected),
            other => Err(BotforgeError::Internal(format!(
                "unknown agent status '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tenant-owned conversational automation entity.
///
/// Versioning is branch-never-mutate: a version-creating update inserts a
/// new row and leaves the source row untouched. Deletion is a soft flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub business_id: String,
    /// Unique among non-deleted agents of the same business.
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub key_words: Vec<String>,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub ai_character: Option<String>,
    #[serde(default)]
    pub global_rules: Option<String>,
    #[serde(default)]
    pub agent_definition: Option<AgentDefinition>,
    #[serde(default = "empty_object")]
    pub metadata: Value,
    pub status: AgentStatus,
    pub is_active: bool,
    pub version: i64,
    pub created_by: String,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Fields accepted when creating an agent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewAgent {
    pub name: String,
    pub description: Option<String>,
    pub key_words: Vec<String>,
    pub variables: Vec<String>,
    pub ai_character: Option<String>,
    pub global_rules: Option<String>,
    pub agent_definition: Option<AgentDefinition>,
    pub metadata: Option<Value>,
}

/// Field-wise patch for updates; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub key_words: Option<Vec<String>>,
    pub variables: Option<Vec<String>>,
    pub ai_character: Option<String>,
    pub global_rules: Option<String>,
    pub agent_definition: Option<AgentDefinition>,
    pub metadata: Option<Value>,
}

/// Parameters for cloning an agent under a new name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CloneRequest {
    pub name: String,
    pub description: Option<String>,
    pub copy_ai_character: bool,
    pub copy_global_rules: bool,
}

impl Agent {
    /// Build a fresh draft agent. Version 1, inactive.
    pub fn create(new: NewAgent, business_id: &str, created_by: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            business_id: business_id.to_string(),
            name: new.name,
            description: new.description.unwrap_or_default(),
            key_words: new.key_words,
            variables: new.variables,
            ai_character: new.ai_character,
            global_rules: new.global_rules,
            agent_definition: new.agent_definition,
            metadata: new.metadata.unwrap_or_else(empty_object),
            status: AgentStatus::Draft,
            is_active: false,
            version: 1,
            created_by: created_by.to_string(),
            approved_by: None,
            approved_at: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Guard for in-place mutation: approved agents are immutable.
    pub fn ensure_mutable(&self) -> Result<()> {
        if self.status == AgentStatus::Approved {
            return Err(BotforgeError::Forbidden(
                "approved agents cannot be updated in place; create a new version".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply a patch field-wise. Does not touch status or versioning.
    pub fn apply_patch(&mut self, patch: &AgentPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(key_words) = &patch.key_words {
            self.key_words = key_words.clone();
        }
        if let Some(variables) = &patch.variables {
            self.variables = variables.clone();
        }
        if let Some(ai_character) = &patch.ai_character {
            self.ai_character = Some(ai_character.clone());
        }
        if let Some(global_rules) = &patch.global_rules {
            self.global_rules = Some(global_rules.clone());
        }
        if let Some(definition) = &patch.agent_definition {
            self.agent_definition = Some(definition.clone());
        }
        if let Some(metadata) = &patch.metadata {
            self.metadata = metadata.clone();
        }
    }

    /// Branch a new draft version from this row. The source is never
    /// mutated; the branch gets a fresh id, `version + 1`, cleared approval
    /// fields, and the patch applied on top of the copied fields.
    pub fn branch_version(&self, patch: &AgentPatch) -> Self {
        let now = Utc::now();
        let mut branched = self.clone();
        branched.id = Uuid::new_v4().to_string();
        branched.apply_patch(patch);
        branched.version = self.version + 1;
        branched.status = AgentStatus::Draft;
        branched.is_active = false;
        branched.approved_by = None;
        branched.approved_at = None;
        branched.created_at = now;
        branched.updated_at = now;
        branched
    }

    /// Build a clone of this agent under a new name. Version resets to 1
    /// regardless of the source, and the metadata records the provenance.
    pub fn clone_as(&self, req: &CloneRequest, created_by: &str) -> Self {
        let now = Utc::now();
        let mut cloned = self.clone();
        cloned.id = Uuid::new_v4().to_string();
        cloned.name = req.name.clone();
        if let Some(description) = &req.description {
            cloned.description = description.clone();
        }
        if !req.copy_ai_character {
            cloned.ai_character = None;
        }
        if !req.copy_global_rules {
            cloned.global_rules = None;
        }
        cloned.status = AgentStatus::Draft;
        cloned.is_active = false;
        cloned.version = 1;
        cloned.created_by = created_by.to_string();
        cloned.approved_by = None;
        cloned.approved_at = None;
        cloned.is_deleted = false;
        cloned.created_at = now;
        cloned.updated_at = now;

        let meta = cloned.metadata_object_mut();
        meta.insert("cloned_from".to_string(), Value::String(self.id.clone()));
        meta.insert("cloned_at".to_string(), Value::String(now.to_rfc3339()));
        cloned
    }

    /// draft → pending_approval.
    pub fn submit(&mut self) -> Result<()> {
        if self.status != AgentStatus::Draft {
            return Err(BotforgeError::BadRequest(format!(
                "only draft agents can be submitted for approval (status is {})",
                self.status
            )));
        }
        self.status = AgentStatus::PendingApproval;
        Ok(())
    }

    /// pending_approval → approved. Records who approved and when.
    pub fn approve(&mut self, approver: &str) -> Result<()> {
        if self.status != AgentStatus::PendingApproval {
            return Err(BotforgeError::BadRequest(format!(
                "only pending agents can be approved (status is {})",
                self.status
            )));
        }
        self.status = AgentStatus::Approved;
        self.approved_by = Some(approver.to_string());
        self.approved_at = Some(Utc::now());
        Ok(())
    }

    /// pending_approval → rejected. The reason lands in the metadata.
    pub fn reject(&mut self, reason: &str) -> Result<()> {
        if self.status != AgentStatus::PendingApproval {
            return Err(BotforgeError::BadRequest(format!(
                "only pending agents can be rejected (status is {})",
                self.status
            )));
        }
        self.status = AgentStatus::Rejected;
        self.metadata_object_mut().insert(
            "rejection_reason".to_string(),
            Value::String(reason.to_string()),
        );
        Ok(())
    }

    /// Toggle the orthogonal active flag. Activation requires approval;
    /// deactivation is always allowed.
    pub fn set_active(&mut self, active: bool) -> Result<()> {
        if active && self.status != AgentStatus::Approved {
            return Err(BotforgeError::BadRequest(format!(
                "only approved agents can be activated (status is {})",
                self.status
            )));
        }
        self.is_active = active;
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// The metadata as a mutable object, replacing any non-object value.
    fn metadata_object_mut(&mut self) -> &mut Map<String, Value> {
        if !self.metadata.is_object() {
            self.metadata = empty_object();
        }
        self.metadata
            .as_object_mut()
            .expect("metadata was just set to an object")
    }
}

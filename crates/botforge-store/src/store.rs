use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use botforge_compiler::compile;
use botforge_core::agent::{Agent, AgentPatch, AgentStatus, CloneRequest, NewAgent};
use botforge_core::definition::AgentDefinition;
use botforge_core::error::{BotforgeError, Result};
use botforge_core::step::{CompiledStep, MessageContent, MessageType};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS agents (
        id TEXT PRIMARY KEY,
        business_id TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        key_words TEXT NOT NULL DEFAULT '[]',
        variables TEXT NOT NULL DEFAULT '[]',
        ai_character TEXT,
        global_rules TEXT,
        agent_definition TEXT,
        metadata TEXT NOT NULL DEFAULT '{}',
        status TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 0,
        version INTEGER NOT NULL DEFAULT 1,
        created_by TEXT NOT NULL,
        approved_by TEXT,
        approved_at TEXT,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_agents_business_name_version
        ON agents(business_id, name, version) WHERE is_deleted = 0;

    CREATE TABLE IF NOT EXISTS agent_steps (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        agent_id TEXT NOT NULL REFERENCES agents(id),
        step TEXT NOT NULL,
        step_name TEXT NOT NULL DEFAULT '',
        variable TEXT NOT NULL DEFAULT '',
        mandatory INTEGER NOT NULL DEFAULT 0,
        check_post INTEGER NOT NULL DEFAULT 0,
        purpose TEXT NOT NULL DEFAULT '',
        enable_ai_takeover INTEGER NOT NULL DEFAULT 0,
        regex TEXT NOT NULL DEFAULT '',
        next_possible_steps TEXT NOT NULL DEFAULT '[]',
        type_of_message TEXT NOT NULL DEFAULT 'text',
        message_content TEXT NOT NULL DEFAULT '{}',
        media_items TEXT NOT NULL DEFAULT '[]',
        ai_config_id INTEGER
    );

    CREATE INDEX IF NOT EXISTS idx_agent_steps_agent ON agent_steps(agent_id);

    CREATE TABLE IF NOT EXISTS ai_configs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        step_id INTEGER NOT NULL REFERENCES agent_steps(id),
        ai_provider TEXT NOT NULL,
        model TEXT NOT NULL,
        max_tokens INTEGER NOT NULL,
        temperature REAL NOT NULL,
        context_input TEXT NOT NULL DEFAULT '',
        system_prompt TEXT NOT NULL DEFAULT ''
    );
";

/// SQLite-backed agent store.
///
/// Agent rows, their compiled step rows, and the steps' AI-config rows are
/// written together inside single transactions; a failure anywhere rolls
/// the whole mutation back, so readers never observe a half-written agent.
pub struct AgentStore {
    conn: Mutex<Connection>,
}

impl AgentStore {
    /// Open or create the agent database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BotforgeError::Database(format!("Failed to create db directory: {}", e))
            })?;
        }

        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!(path = %path.display(), "agent store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| BotforgeError::Database(e.to_string()))
    }

    /// Create a draft agent, compiling and persisting its step script when
    /// the definition has both nodes and connections.
    pub fn create_agent(&self, new: NewAgent, business_id: &str, user_id: &str) -> Result<Agent> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;

        ensure_name_free(&tx, business_id, &new.name)?;
        let agent = Agent::create(new, business_id, user_id);
        insert_agent(&tx, &agent)?;
        compile_children(&tx, &agent)?;

        tx.commit().map_err(db_err)?;
        info!(agent_id = %agent.id, name = %agent.name, "agent created");
        Ok(agent)
    }

    /// Fetch one agent, scoped to its business. Soft-deleted rows are
    /// invisible.
    pub fn get_agent(&self, id: &str, business_id: &str) -> Result<Agent> {
        let conn = self.lock()?;
        load_agent(&conn, id, business_id)
    }

    /// All non-deleted agents of a business, newest first.
    pub fn list_agents(&self, business_id: &str) -> Result<Vec<Agent>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {AGENT_COLUMNS} FROM agents
                 WHERE business_id = ?1 AND is_deleted = 0
                 ORDER BY created_at DESC, id"
            ))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![business_id], raw_agent_from_row)
            .map_err(db_err)?;

        let mut agents = Vec::new();
        for row in rows {
            agents.push(row.map_err(db_err)?.into_agent()?);
        }
        Ok(agents)
    }

    /// Patch an agent in place, or branch a new draft version when
    /// `create_version` is set.
    ///
    /// In-place updates are forbidden for approved agents. When the patch
    /// carries a definition, the agent's step rows are replaced wholesale;
    /// a version branch compiles its own children from whatever definition
    /// the new row ends up with.
    pub fn update_agent(
        &self,
        id: &str,
        patch: AgentPatch,
        business_id: &str,
        create_version: bool,
    ) -> Result<Agent> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;

        let current = load_agent(&tx, id, business_id)?;
        let definition_supplied = patch.agent_definition.is_some();

        let agent = if create_version {
            let branched = current.branch_version(&patch);
            insert_agent(&tx, &branched)?;
            compile_children(&tx, &branched)?;
            branched
        } else {
            current.ensure_mutable()?;
            let mut updated = current;
            updated.apply_patch(&patch);
            updated.touch();
            update_agent_row(&tx, &updated)?;
            if definition_supplied {
                let steps = updated
                    .agent_definition
                    .as_ref()
                    .filter(|def| def.is_compilable())
                    .map(compile)
                    .unwrap_or_default();
                replace_steps(&tx, &updated.id, &steps)?;
            }
            updated
        };

        tx.commit().map_err(db_err)?;
        info!(
            agent_id = %agent.id,
            version = agent.version,
            new_version = create_version,
            "agent updated"
        );
        Ok(agent)
    }

    /// Soft-delete an agent. No status transition; the row stays behind the
    /// deleted flag and its name becomes reusable.
    pub fn delete_agent(&self, id: &str, business_id: &str) -> Result<()> {
        let conn = self.lock()?;
        let mut agent = load_agent(&conn, id, business_id)?;
        agent.is_deleted = true;
        agent.touch();
        update_agent_row(&conn, &agent)?;
        info!(agent_id = %agent.id, "agent soft-deleted");
        Ok(())
    }

    /// draft → pending_approval.
    pub fn submit_agent(&self, id: &str, business_id: &str) -> Result<Agent> {
        self.transition(id, business_id, |agent| agent.submit())
    }

    /// pending_approval → approved.
    pub fn approve_agent(&self, id: &str, business_id: &str, approver: &str) -> Result<Agent> {
        self.transition(id, business_id, |agent| agent.approve(approver))
    }

    /// pending_approval → rejected, with the reason kept in metadata.
    pub fn reject_agent(&self, id: &str, business_id: &str, reason: &str) -> Result<Agent> {
        self.transition(id, business_id, |agent| agent.reject(reason))
    }

    /// Flip the active flag. Activation requires approved status.
    pub fn toggle_agent_status(
        &self,
        id: &str,
        business_id: &str,
        is_active: bool,
    ) -> Result<Agent> {
        self.transition(id, business_id, |agent| agent.set_active(is_active))
    }

    /// Clone an agent under a new name: version resets to 1, status to
    /// draft, and the copy's step script is compiled from the copied
    /// definition.
    pub fn clone_agent(
        &self,
        source_id: &str,
        req: CloneRequest,
        business_id: &str,
        user_id: &str,
    ) -> Result<Agent> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;

        let source = load_agent(&tx, source_id, business_id)?;
        ensure_name_free(&tx, business_id, &req.name)?;
        let cloned = source.clone_as(&req, user_id);
        insert_agent(&tx, &cloned)?;
        compile_children(&tx, &cloned)?;

        tx.commit().map_err(db_err)?;
        info!(agent_id = %cloned.id, source_id = %source.id, "agent cloned");
        Ok(cloned)
    }

    /// The compiled step rows of an agent with their AI configs joined,
    /// optionally narrowed to one step identifier.
    pub fn get_agent_steps(
        &self,
        agent_id: &str,
        business_id: &str,
        step: Option<&str>,
    ) -> Result<Vec<CompiledStep>> {
        let conn = self.lock()?;
        load_agent(&conn, agent_id, business_id)?;

        let sql = "SELECT s.step, s.step_name, s.variable, s.mandatory, s.check_post,
                          s.purpose, s.enable_ai_takeover, s.regex, s.next_possible_steps,
                          s.type_of_message, s.message_content, s.media_items,
                          c.ai_provider, c.model, c.max_tokens, c.temperature,
                          c.context_input, c.system_prompt
                   FROM agent_steps s
                   LEFT JOIN ai_configs c ON c.id = s.ai_config_id
                   WHERE s.agent_id = ?1 AND (?2 IS NULL OR s.step = ?2)
                   ORDER BY s.id";

        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params![agent_id, step], step_from_row)
            .map_err(db_err)?;

        let mut steps = Vec::new();
        for row in rows {
            steps.push(row.map_err(db_err)?);
        }
        Ok(steps)
    }

    fn transition<F>(&self, id: &str, business_id: &str, apply: F) -> Result<Agent>
    where
        F: FnOnce(&mut Agent) -> Result<()>,
    {
        let conn = self.lock()?;
        let mut agent = load_agent(&conn, id, business_id)?;
        apply(&mut agent)?;
        agent.touch();
        update_agent_row(&conn, &agent)?;
        debug!(agent_id = %agent.id, status = %agent.status, active = agent.is_active, "agent transitioned");
        Ok(agent)
    }
}

const AGENT_COLUMNS: &str = "id, business_id, name, description, key_words, variables, \
     ai_character, global_rules, agent_definition, metadata, status, is_active, version, \
     created_by, approved_by, approved_at, is_deleted, created_at, updated_at";

/// Column values as read, before JSON and timestamp hydration.
struct RawAgent {
    id: String,
    business_id: String,
    name: String,
    description: String,
    key_words: String,
    variables: String,
    ai_character: Option<String>,
    global_rules: Option<String>,
    agent_definition: Option<String>,
    metadata: String,
    status: String,
    is_active: bool,
    version: i64,
    created_by: String,
    approved_by: Option<String>,
    approved_at: Option<String>,
    is_deleted: bool,
    created_at: String,
    updated_at: String,
}

fn raw_agent_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAgent> {
    Ok(RawAgent {
        id: row.get(0)?,
        business_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        key_words: row.get(4)?,
        variables: row.get(5)?,
        ai_character: row.get(6)?,
        global_rules: row.get(7)?,
        agent_definition: row.get(8)?,
        metadata: row.get(9)?,
        status: row.get(10)?,
        is_active: row.get(11)?,
        version: row.get(12)?,
        created_by: row.get(13)?,
        approved_by: row.get(14)?,
        approved_at: row.get(15)?,
        is_deleted: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

impl RawAgent {
    fn into_agent(self) -> Result<Agent> {
        let agent_definition: Option<AgentDefinition> = self
            .agent_definition
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Agent {
            id: self.id,
            business_id: self.business_id,
            name: self.name,
            description: self.description,
            key_words: serde_json::from_str(&self.key_words).unwrap_or_default(),
            variables: serde_json::from_str(&self.variables).unwrap_or_default(),
            ai_character: self.ai_character,
            global_rules: self.global_rules,
            agent_definition,
            metadata: serde_json::from_str(&self.metadata)
                .unwrap_or_else(|_| serde_json::Value::Object(Default::default())),
            status: AgentStatus::parse(&self.status)?,
            is_active: self.is_active,
            version: self.version,
            created_by: self.created_by,
            approved_by: self.approved_by,
            approved_at: self.approved_at.as_deref().and_then(parse_timestamp_opt),
            is_deleted: self.is_deleted,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_timestamp_opt(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn load_agent(conn: &Connection, id: &str, business_id: &str) -> Result<Agent> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {AGENT_COLUMNS} FROM agents
                 WHERE id = ?1 AND business_id = ?2 AND is_deleted = 0"
            ),
            params![id, business_id],
            raw_agent_from_row,
        )
        .optional()
        .map_err(db_err)?;

    match raw {
        Some(raw) => raw.into_agent(),
        None => Err(BotforgeError::NotFound(format!("agent '{id}' not found"))),
    }
}

/// Name uniqueness is checked against all non-deleted rows of the business.
/// Version branches deliberately share their lineage's name, so this guard
/// runs only on create and clone.
fn ensure_name_free(conn: &Connection, business_id: &str, name: &str) -> Result<()> {
    let taken: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM agents
             WHERE business_id = ?1 AND name = ?2 AND is_deleted = 0)",
            params![business_id, name],
            |row| row.get(0),
        )
        .map_err(db_err)?;

    if taken {
        return Err(BotforgeError::Conflict(format!(
            "an agent named '{name}' already exists for this business"
        )));
    }
    Ok(())
}

fn insert_agent(conn: &Connection, agent: &Agent) -> Result<()> {
    conn.execute(
        "INSERT INTO agents (id, business_id, name, description, key_words, variables,
             ai_character, global_rules, agent_definition, metadata, status, is_active,
             version, created_by, approved_by, approved_at, is_deleted, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            agent.id,
            agent.business_id,
            agent.name,
            agent.description,
            serde_json::to_string(&agent.key_words)?,
            serde_json::to_string(&agent.variables)?,
            agent.ai_character,
            agent.global_rules,
            agent
                .agent_definition
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            serde_json::to_string(&agent.metadata)?,
            agent.status.as_str(),
            agent.is_active,
            agent.version,
            agent.created_by,
            agent.approved_by,
            agent.approved_at.map(|dt| dt.to_rfc3339()),
            agent.is_deleted,
            agent.created_at.to_rfc3339(),
            agent.updated_at.to_rfc3339(),
        ],
    )
    .map_err(db_err)?;
    Ok(())
}

fn update_agent_row(conn: &Connection, agent: &Agent) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE agents SET name = ?2, description = ?3, key_words = ?4, variables = ?5,
                 ai_character = ?6, global_rules = ?7, agent_definition = ?8, metadata = ?9,
                 status = ?10, is_active = ?11, version = ?12, approved_by = ?13,
                 approved_at = ?14, is_deleted = ?15, updated_at = ?16
             WHERE id = ?1",
            params![
                agent.id,
                agent.name,
                agent.description,
                serde_json::to_string(&agent.key_words)?,
                serde_json::to_string(&agent.variables)?,
                agent.ai_character,
                agent.global_rules,
                agent
                    .agent_definition
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                serde_json::to_string(&agent.metadata)?,
                agent.status.as_str(),
                agent.is_active,
                agent.version,
                agent.approved_by,
                agent.approved_at.map(|dt| dt.to_rfc3339()),
                agent.is_deleted,
                agent.updated_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

    if changed == 0 {
        return Err(BotforgeError::NotFound(format!(
            "agent '{}' not found",
            agent.id
        )));
    }
    Ok(())
}

/// Compile and persist the step script for a freshly inserted agent row.
fn compile_children(conn: &Connection, agent: &Agent) -> Result<()> {
    if let Some(def) = agent
        .agent_definition
        .as_ref()
        .filter(|def| def.is_compilable())
    {
        replace_steps(conn, &agent.id, &compile(def))?;
    }
    Ok(())
}

/// Replace an agent's compiled step rows wholesale.
///
/// AI-config rows hang off step rows, so they go first. Each new step row
/// is inserted, its AI config (when present) inserted against it, and the
/// step row patched with the config's id as a back-reference — all on the
/// caller's transaction, never committed piecemeal.
fn replace_steps(conn: &Connection, agent_id: &str, steps: &[CompiledStep]) -> Result<()> {
    conn.execute(
        "DELETE FROM ai_configs WHERE step_id IN
             (SELECT id FROM agent_steps WHERE agent_id = ?1)",
        params![agent_id],
    )
    .map_err(db_err)?;
    conn.execute(
        "DELETE FROM agent_steps WHERE agent_id = ?1",
        params![agent_id],
    )
    .map_err(db_err)?;

    for step in steps {
        conn.execute(
            "INSERT INTO agent_steps (agent_id, step, step_name, variable, mandatory,
                 check_post, purpose, enable_ai_takeover, regex, next_possible_steps,
                 type_of_message, message_content, media_items)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                agent_id,
                step.step,
                step.step_name,
                step.variable,
                step.mandatory,
                step.check_post,
                step.purpose,
                step.enable_ai_takeover,
                step.regex,
                serde_json::to_string(&step.next_possible_steps)?,
                step.type_of_message.as_str(),
                serde_json::to_string(&step.message_content)?,
                serde_json::to_string(&step.media_items)?,
            ],
        )
        .map_err(db_err)?;
        let step_row_id = conn.last_insert_rowid();

        if let Some(cfg) = &step.ai_config {
            conn.execute(
                "INSERT INTO ai_configs (step_id, ai_provider, model, max_tokens,
                     temperature, context_input, system_prompt)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    step_row_id,
                    cfg.ai_provider,
                    cfg.model,
                    cfg.max_tokens,
                    cfg.temperature,
                    cfg.context_input,
                    cfg.system_prompt,
                ],
            )
            .map_err(db_err)?;
            let config_id = conn.last_insert_rowid();

            conn.execute(
                "UPDATE agent_steps SET ai_config_id = ?1 WHERE id = ?2",
                params![config_id, step_row_id],
            )
            .map_err(db_err)?;
        }
    }

    debug!(agent_id, steps = steps.len(), "replaced compiled step rows");
    Ok(())
}

fn step_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CompiledStep> {
    let next_json: String = row.get(8)?;
    let type_str: String = row.get(9)?;
    let content_json: String = row.get(10)?;
    let media_json: String = row.get(11)?;

    let ai_provider: Option<String> = row.get(12)?;
    let ai_config = match ai_provider {
        Some(ai_provider) => Some(botforge_core::definition::AiConfig {
            ai_provider,
            model: row.get(13)?,
            max_tokens: row.get(14)?,
            temperature: row.get(15)?,
            context_input: row.get(16)?,
            system_prompt: row.get(17)?,
        }),
        None => None,
    };

    Ok(CompiledStep {
        step: row.get(0)?,
        step_name: row.get(1)?,
        variable: row.get(2)?,
        mandatory: row.get(3)?,
        check_post: row.get(4)?,
        purpose: row.get(5)?,
        enable_ai_takeover: row.get(6)?,
        regex: row.get(7)?,
        next_possible_steps: serde_json::from_str(&next_json).unwrap_or_default(),
        type_of_message: MessageType::parse(&type_str),
        message_content: serde_json::from_str(&content_json)
            .unwrap_or(MessageContent::Unknown),
        media_items: serde_json::from_str(&media_json).unwrap_or_default(),
        ai_config,
    })
}

fn db_err(e: rusqlite::Error) -> BotforgeError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return BotforgeError::Conflict("agent name and version already in use".to_string());
        }
    }
    BotforgeError::Database(e.to_string())
}

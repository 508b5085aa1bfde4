use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use botforge_core::agent::{AgentPatch, CloneRequest, NewAgent};
use botforge_core::definition::AgentDefinition;
use botforge_store::AgentStore;

#[derive(Parser)]
#[command(name = "botforge", version, about = "Conversational agent builder: graph compiler and lifecycle store")]
struct Cli {
    /// Path to the agent database
    #[arg(long, default_value = "botforge.db")]
    db: PathBuf,

    /// Business (tenant) id all operations are scoped to
    #[arg(short, long, default_value = "default", env = "BOTFORGE_BUSINESS")]
    business: String,

    /// Acting user id
    #[arg(short, long, default_value = "cli", env = "BOTFORGE_USER")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a definition file and print the step script without persisting
    Compile {
        /// Path to an agent definition JSON file ({nodes, connections})
        file: PathBuf,
    },
    /// Create an agent from a JSON file
    Create {
        /// Path to a JSON file with the new agent's fields
        file: PathBuf,
    },
    /// Patch an agent from a JSON file; optionally branch a new version
    Update {
        id: String,
        file: PathBuf,
        /// Branch a new draft version instead of updating in place
        #[arg(long)]
        new_version: bool,
    },
    /// Submit a draft agent for approval
    Submit { id: String },
    /// Approve a pending agent
    Approve { id: String },
    /// Reject a pending agent
    Reject {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Activate an approved agent
    Activate { id: String },
    /// Deactivate an agent
    Deactivate { id: String },
    /// Clone an agent under a new name
    Clone {
        id: String,
        name: String,
        #[arg(long)]
        copy_ai_character: bool,
        #[arg(long)]
        copy_global_rules: bool,
    },
    /// Soft-delete an agent
    Delete { id: String },
    /// Show one agent
    Show { id: String },
    /// List the business's agents
    List,
    /// Print an agent's compiled steps
    Steps {
        id: String,
        /// Narrow to a single step identifier
        #[arg(long)]
        step: Option<String>,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // `compile` needs no database
    if let Commands::Compile { file } = &cli.command {
        let definition: AgentDefinition = read_json(file)?;
        if !definition.is_compilable() {
            anyhow::bail!("definition needs non-empty nodes and connections");
        }
        return print_json(&botforge_compiler::compile(&definition));
    }

    let store = AgentStore::open(&cli.db)?;
    let business = cli.business.as_str();
    let user = cli.user.as_str();

    match cli.command {
        Commands::Compile { .. } => unreachable!("handled above"),
        Commands::Create { file } => {
            let new: NewAgent = read_json(&file)?;
            print_json(&store.create_agent(new, business, user)?)
        }
        Commands::Update {
            id,
            file,
            new_version,
        } => {
            let patch: AgentPatch = read_json(&file)?;
            print_json(&store.update_agent(&id, patch, business, new_version)?)
        }
        Commands::Submit { id } => print_json(&store.submit_agent(&id, business)?),
        Commands::Approve { id } => print_json(&store.approve_agent(&id, business, user)?),
        Commands::Reject { id, reason } => {
            print_json(&store.reject_agent(&id, business, &reason)?)
        }
        Commands::Activate { id } => {
            print_json(&store.toggle_agent_status(&id, business, true)?)
        }
        Commands::Deactivate { id } => {
            print_json(&store.toggle_agent_status(&id, business, false)?)
        }
        Commands::Clone {
            id,
            name,
            copy_ai_character,
            copy_global_rules,
        } => {
            let req = CloneRequest {
                name,
                description: None,
                copy_ai_character,
                copy_global_rules,
            };
            print_json(&store.clone_agent(&id, req, business, user)?)
        }
        Commands::Delete { id } => {
            store.delete_agent(&id, business)?;
            println!("deleted {id}");
            Ok(())
        }
        Commands::Show { id } => print_json(&store.get_agent(&id, business)?),
        Commands::List => print_json(&store.list_agents(business)?),
        Commands::Steps { id, step } => {
            print_json(&store.get_agent_steps(&id, business, step.as_deref())?)
        }
    }
}

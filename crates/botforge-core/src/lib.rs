pub mod agent;
pub mod definition;
pub mod error;
pub mod step;

pub use agent::{Agent, AgentPatch, AgentStatus, CloneRequest, NewAgent};
pub use definition::{AgentDefinition, AiConfig, Edge, Node, NodeData, NodeKind};
pub use error::{BotforgeError, Result};
pub use step::{CompiledStep, MessageContent, MessageType, STOP_STEP};

//! Graph-to-step compiler — flattens a visual agent graph into a script.
//!
//! A definition is a directed graph of typed `Node`s connected by `Edge`s.
//! Compilation assigns every non-start node a stable step identifier,
//! resolves each node's outgoing edges into next-step references and option
//! postbacks, and emits one self-contained `CompiledStep` document per node
//! for the conversation runtime to execute.
//!
//! `compile` is pure: no side effects, and deterministic for a given
//! definition. Persistence of the output is the store's concern.

pub mod address;
pub mod ai;
pub mod compile;
pub mod content;
pub mod next;
pub mod options;
pub mod registry;

pub use address::StepAddressMap;
pub use ai::ai_takeover;
pub use compile::compile;
pub use content::message_content;
pub use next::next_possible_steps;
pub use options::resolve_option;
pub use registry::message_type_for;

//! SQLite persistence for agents and their compiled step scripts.
//!
//! Every mutating operation is one transaction: the agent row write, the
//! compile of a supplied definition, and the wholesale replacement of the
//! agent's child step and AI-config rows either all land or none do.

mod store;

pub use store::AgentStore;

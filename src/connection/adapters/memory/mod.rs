//! In-memory adapters for agent registry state.

mod registry;

pub use registry::InMemoryAgentRegistry;

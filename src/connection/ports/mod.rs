//! Port contracts for agent launch and registry state.

mod launcher;
mod registry;

pub use launcher::{AgentLauncher, LaunchError, LaunchRequest, LaunchResult};
pub use registry::{
    AgentRegistry, AgentRegistryError, AgentRegistryResult, RegistrationOutcome,
};

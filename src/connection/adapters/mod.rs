//! Adapter implementations for agent launch and registry ports.

pub mod memory;

mod command;
mod process;
mod simulated;

pub use command::CommandLine;
pub use process::ProcessLauncher;
pub use simulated::{LaunchRecord, SimulatedAgentLauncher};

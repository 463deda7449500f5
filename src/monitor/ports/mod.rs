//! Port contracts for monitors and agent probes.

mod monitor;
mod probe;

pub use monitor::{Monitor, MonitorCheckError, MonitorCheckResult};
pub use probe::{AgentProbe, ProbeError, ProbeResult};

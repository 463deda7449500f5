//! In-process launcher adapter backed by simulated agents.

use super::CommandLine;
use crate::connection::{
    channel::AgentChannel,
    domain::{AgentName, AgentSequence, LaunchConfig},
    ports::{AgentLauncher, LaunchError, LaunchRequest, LaunchResult},
    protocol::AgentManifest,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use tokio::io::duplex;
use tracing::{debug, info};

const PIPE_CAPACITY: usize = 64 * 1024;

/// A launch performed by [`SimulatedAgentLauncher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRecord {
    /// Launched agent.
    pub agent: AgentName,
    /// Sequence number of the launch.
    pub sequence: AgentSequence,
    /// Command the process launcher would have run, when configured.
    pub command: Option<CommandLine>,
}

/// Launcher adapter that runs agents in-process.
///
/// Each launch spawns a Tokio task speaking the agent side of the protocol
/// over an in-memory pipe, configured by the manifest registered for the
/// agent name. This adapter is suitable for unit and integration tests and
/// for local deterministic orchestration flows.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAgentLauncher {
    state: Arc<RwLock<SimulatedLauncherState>>,
}

#[derive(Debug, Default)]
struct SimulatedLauncherState {
    manifests: HashMap<AgentName, AgentManifest>,
    launch_config: Option<LaunchConfig>,
    launches: Vec<LaunchRecord>,
}

impl SimulatedAgentLauncher {
    /// Creates a launcher with no agent definitions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the manifest used for `agent`.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Runtime`] when lock acquisition fails.
    pub fn define_agent(&self, agent: AgentName, manifest: AgentManifest) -> LaunchResult<()> {
        let mut state = self.write_state()?;
        state.manifests.insert(agent, manifest);
        Ok(())
    }

    /// Renders and records the command each launch would run.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Runtime`] when lock acquisition fails.
    pub fn record_commands_with(&self, config: LaunchConfig) -> LaunchResult<()> {
        let mut state = self.write_state()?;
        state.launch_config = Some(config);
        Ok(())
    }

    /// Returns every launch performed so far, in launch order.
    #[must_use]
    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.state
            .read()
            .map(|state| state.launches.clone())
            .unwrap_or_default()
    }

    fn write_state(&self) -> LaunchResult<RwLockWriteGuard<'_, SimulatedLauncherState>> {
        self.state
            .write()
            .map_err(|err| LaunchError::runtime(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl AgentLauncher for SimulatedAgentLauncher {
    async fn launch(&self, request: &LaunchRequest) -> LaunchResult<AgentChannel> {
        let manifest = {
            let mut state = self.write_state()?;
            let manifest = state
                .manifests
                .get(request.agent())
                .cloned()
                .ok_or_else(|| LaunchError::UnknownAgent(request.agent().clone()))?;
            let command = state
                .launch_config
                .as_ref()
                .map(|config| CommandLine::render(config, request.sequence()))
                .transpose()?;
            state.launches.push(LaunchRecord {
                agent: request.agent().clone(),
                sequence: request.sequence(),
                command,
            });
            manifest
        };

        let (controller_side, agent_side) = duplex(PIPE_CAPACITY);
        let (controller_read, controller_write) = tokio::io::split(controller_side);
        let (agent_read, agent_write) = tokio::io::split(agent_side);

        let agent = request.agent().clone();
        tokio::spawn(async move {
            let channel = AgentChannel::new(agent_read, agent_write);
            if let Err(err) = manifest.serve(&channel).await {
                debug!(agent = %agent, error = %err, "simulated agent stopped");
            }
        });

        info!(
            agent = %request.agent(),
            sequence = %request.sequence(),
            "launched simulated agent"
        );
        Ok(AgentChannel::new(controller_read, controller_write))
    }
}

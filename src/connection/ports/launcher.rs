//! Launcher port for starting agent processes.

use crate::connection::{
    channel::AgentChannel,
    domain::{AgentName, AgentSequence, ConnectionDomainError},
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for launcher operations.
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Identity and sequence of the agent to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    agent: AgentName,
    sequence: AgentSequence,
}

impl LaunchRequest {
    /// Creates a launch request.
    #[must_use]
    pub const fn new(agent: AgentName, sequence: AgentSequence) -> Self {
        Self { agent, sequence }
    }

    /// Returns the agent name.
    #[must_use]
    pub const fn agent(&self) -> &AgentName {
        &self.agent
    }

    /// Returns the launch sequence number.
    #[must_use]
    pub const fn sequence(&self) -> AgentSequence {
        self.sequence
    }
}

/// Starts agents and hands back a live channel.
///
/// Launch failures are final for the attempt; retrying is the caller's
/// decision.
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    /// Starts the agent described by `request`.
    async fn launch(&self, request: &LaunchRequest) -> LaunchResult<AgentChannel>;
}

/// Errors returned by launcher adapters.
#[derive(Debug, Clone, Error)]
pub enum LaunchError {
    /// The agent process could not be started.
    #[error("failed to spawn agent {agent} with command `{command}`: {source}")]
    SpawnFailed {
        /// Agent name.
        agent: AgentName,
        /// Rendered command line.
        command: String,
        /// Underlying spawn error.
        source: Arc<std::io::Error>,
    },

    /// A configured path does not point at something launchable.
    #[error("invalid launch path '{path}': {reason}")]
    PathInvalid {
        /// Offending path.
        path: String,
        /// Reason string.
        reason: String,
    },

    /// The command template failed to render.
    #[error("launch command template failed to render: {0}")]
    InvalidTemplate(String),

    /// The launch configuration is invalid for this request.
    #[error(transparent)]
    Config(#[from] ConnectionDomainError),

    /// The launcher has no definition for the requested agent.
    #[error("no launch definition for agent {0}")]
    UnknownAgent(AgentName),

    /// Generic launcher runtime failure.
    #[error("agent launcher runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl LaunchError {
    /// Wraps a spawn failure.
    pub fn spawn_failed(agent: AgentName, command: impl Into<String>, err: std::io::Error) -> Self {
        Self::SpawnFailed {
            agent,
            command: command.into(),
            source: Arc::new(err),
        }
    }

    /// Wraps a runtime error from the launcher adapter.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }

    /// Creates a path validation failure.
    pub fn path_invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PathInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

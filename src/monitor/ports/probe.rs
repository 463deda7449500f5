//! Agent-facing measurements used by the built-in monitors.

use crate::connection::{domain::AgentConnection, protocol::DiskLocation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Request/response access to a connected agent.
#[async_trait]
pub trait AgentProbe: Send + Sync {
    /// Sends a no-op request and waits for the answer.
    async fn ping(&self, agent: &AgentConnection) -> ProbeResult<()>;

    /// Returns the agent's operating system and CPU description.
    async fn architecture(&self, agent: &AgentConnection) -> ProbeResult<String>;

    /// Returns the agent's current wall-clock time.
    async fn clock(&self, agent: &AgentConnection) -> ProbeResult<DateTime<Utc>>;

    /// Returns free bytes at `location` on the agent.
    async fn free_space(
        &self,
        agent: &AgentConnection,
        location: DiskLocation,
    ) -> ProbeResult<u64>;
}

/// Errors returned by probe implementations.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    /// The agent answered `UNSUPPORTED`.
    #[error("agent does not support {command}")]
    Unsupported {
        /// Request that was not understood.
        command: String,
    },

    /// The channel is closed.
    #[error("agent channel closed")]
    ChannelClosed,

    /// The agent answered `ERR`.
    #[error("agent reported error: {0}")]
    Remote(String),

    /// The agent answered with an unparseable frame.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Transport failure.
    #[error("probe transport error: {0}")]
    Io(Arc<io::Error>),
}

impl From<io::Error> for ProbeError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotConnected {
            return Self::ChannelClosed;
        }
        Self::Io(Arc::new(err))
    }
}

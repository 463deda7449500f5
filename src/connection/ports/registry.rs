//! Registry port for online agent connections.

use crate::connection::domain::{AgentConnection, AgentName, ConnectionState};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for agent registry operations.
pub type AgentRegistryResult<T> = Result<T, AgentRegistryError>;

/// Outcome of registering a connection.
#[derive(Debug, Clone)]
pub enum RegistrationOutcome {
    /// No connection with the same name existed.
    Registered,
    /// A connection with the same name was replaced.
    Reconnected(Box<AgentConnection>),
}

impl RegistrationOutcome {
    /// Returns whether an earlier connection was replaced.
    #[must_use]
    pub const fn is_reconnection(&self) -> bool {
        matches!(self, Self::Reconnected(_))
    }
}

/// Process-wide table of online agents keyed by agent name.
///
/// Implementations must be safe for concurrent readers and writers and must
/// replace entries atomically: a reader observes either the previous or the
/// new connection for a name, never neither.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Stores an online connection, replacing any entry with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRegistryError::NotOnline`] when the connection has not
    /// passed the handshake.
    async fn register(
        &self,
        connection: AgentConnection,
    ) -> AgentRegistryResult<RegistrationOutcome>;

    /// Removes and returns the connection registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRegistryError::NotFound`] when no entry exists.
    async fn unregister(&self, name: &AgentName) -> AgentRegistryResult<AgentConnection>;

    /// Returns the connection registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentRegistryError::NotFound`] when no entry exists.
    async fn get(&self, name: &AgentName) -> AgentRegistryResult<AgentConnection>;

    /// Returns a snapshot of all registered connections ordered by name.
    async fn list(&self) -> AgentRegistryResult<Vec<AgentConnection>>;

    /// Removes and returns every registered connection.
    async fn clear(&self) -> AgentRegistryResult<Vec<AgentConnection>>;
}

/// Errors returned by agent registry implementations.
#[derive(Debug, Clone, Error)]
pub enum AgentRegistryError {
    /// No agent is registered under the name.
    #[error("agent not found: {0}")]
    NotFound(AgentName),

    /// Only online connections may be registered.
    #[error("agent {agent} cannot be registered in state {state}")]
    NotOnline {
        /// Agent name.
        agent: AgentName,
        /// Connection state at registration time.
        state: ConnectionState,
    },

    /// Registry storage failure.
    #[error("agent registry storage error: {0}")]
    Storage(Arc<dyn std::error::Error + Send + Sync>),
}

impl AgentRegistryError {
    /// Wraps a storage-layer failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }
}

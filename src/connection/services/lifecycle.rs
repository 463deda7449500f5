//! Launch, handshake and registration of agent connections.

use super::handshake::{HandshakeError, HandshakeNegotiator};
use crate::connection::{
    channel::SharedChannel,
    domain::{AgentConnection, AgentName, AgentSequence, ConnectionDomainError},
    ports::{
        AgentLauncher, AgentRegistry, AgentRegistryError, LaunchError, LaunchRequest,
        RegistrationOutcome,
    },
};
use futures::future::join_all;
use mockable::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Service-level errors for connection lifecycle operations.
#[derive(Debug, Error)]
pub enum ConnectionServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] ConnectionDomainError),
    /// The agent could not be launched.
    #[error(transparent)]
    Launch(#[from] LaunchError),
    /// The agent failed the version handshake.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
    /// Registry operation failed.
    #[error(transparent)]
    Registry(#[from] AgentRegistryError),
}

/// Result type for connection lifecycle operations.
pub type ConnectionServiceResult<T> = Result<T, ConnectionServiceError>;

/// Orchestrates launcher, negotiator and registry for each agent.
///
/// Every launch receives a fresh sequence number. Only agents that pass the
/// handshake reach the registry; rejected agents have their channel closed.
pub struct AgentConnectionService<L, R, C>
where
    L: AgentLauncher,
    R: AgentRegistry,
    C: Clock + Send + Sync,
{
    launcher: Arc<L>,
    registry: Arc<R>,
    negotiator: HandshakeNegotiator,
    clock: Arc<C>,
    next_sequence: AtomicU32,
}

impl<L, R, C> AgentConnectionService<L, R, C>
where
    L: AgentLauncher,
    R: AgentRegistry,
    C: Clock + Send + Sync,
{
    /// Creates a connection service.
    #[must_use]
    pub const fn new(
        launcher: Arc<L>,
        registry: Arc<R>,
        negotiator: HandshakeNegotiator,
        clock: Arc<C>,
    ) -> Self {
        Self {
            launcher,
            registry,
            negotiator,
            clock,
            next_sequence: AtomicU32::new(0),
        }
    }

    /// Returns the registry that receives online agents.
    #[must_use]
    pub const fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Returns the handshake negotiator.
    #[must_use]
    pub const fn negotiator(&self) -> &HandshakeNegotiator {
        &self.negotiator
    }

    /// Launches `agent`, negotiates its version and registers it.
    ///
    /// A registered connection with the same name is replaced and its channel
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionServiceError`] when the name is invalid, the launch
    /// fails, the handshake rejects the agent, or registration fails.
    pub async fn connect(&self, agent: &str) -> ConnectionServiceResult<AgentConnection> {
        let name = AgentName::new(agent)?;
        let sequence = AgentSequence::new(self.next_sequence.fetch_add(1, Ordering::Relaxed));
        let request = LaunchRequest::new(name.clone(), sequence);

        let channel = self.launcher.launch(&request).await?.into_shared();
        let mut connection =
            AgentConnection::new(name, sequence, Arc::clone(&channel), self.clock.as_ref());
        connection.begin_handshake(self.clock.as_ref())?;

        let outcome = self.negotiator.negotiate(&channel).await;

        let negotiated = match outcome {
            Ok(negotiated) => negotiated,
            Err(err) => {
                connection.mark_rejected(self.clock.as_ref())?;
                close_channel(connection.name(), &channel).await;
                warn!(agent = %connection.name(), %sequence, error = %err, "agent rejected");
                return Err(err.into());
            }
        };

        connection.mark_online(negotiated, self.clock.as_ref())?;
        match self.registry.register(connection.clone()).await {
            Ok(RegistrationOutcome::Registered) => {}
            Ok(RegistrationOutcome::Reconnected(previous)) => {
                info!(agent = %previous.name(), previous = %previous.id(), "replacing agent connection");
                close_channel(previous.name(), previous.channel()).await;
            }
            Err(err) => {
                close_channel(connection.name(), &channel).await;
                return Err(err.into());
            }
        }

        info!(
            agent = %connection.name(),
            %sequence,
            os_family = %connection.os_family(),
            "agent online"
        );
        Ok(connection)
    }

    /// Connects several agents concurrently.
    ///
    /// Results are returned in input order; one failing agent does not affect
    /// the others.
    pub async fn connect_fleet(
        &self,
        agents: &[&str],
    ) -> Vec<ConnectionServiceResult<AgentConnection>> {
        join_all(agents.iter().map(|agent| self.connect(agent))).await
    }

    /// Removes `agent` from the registry and closes its channel.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionServiceError`] when the name is invalid or no such
    /// agent is registered.
    pub async fn disconnect(&self, agent: &str) -> ConnectionServiceResult<AgentConnection> {
        let name = AgentName::new(agent)?;
        let connection = self.registry.unregister(&name).await?;
        let released = self.release(connection).await?;
        info!(agent = %released.name(), "agent disconnected");
        Ok(released)
    }

    /// Clears the registry and closes every channel.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionServiceError::Registry`] when the registry cannot
    /// be cleared.
    pub async fn shutdown(&self) -> ConnectionServiceResult<Vec<AgentConnection>> {
        let connections = self.registry.clear().await?;
        let mut released = Vec::with_capacity(connections.len());
        for connection in connections {
            released.push(self.release(connection).await?);
        }
        info!(count = released.len(), "controller connections shut down");
        Ok(released)
    }

    async fn release(
        &self,
        mut connection: AgentConnection,
    ) -> ConnectionServiceResult<AgentConnection> {
        connection.mark_disconnected(self.clock.as_ref())?;
        close_channel(connection.name(), connection.channel()).await;
        Ok(connection)
    }
}

async fn close_channel(agent: &AgentName, channel: &SharedChannel) {
    if let Err(err) = channel.close().await {
        debug!(%agent, error = %err, "agent channel did not close cleanly");
    }
}

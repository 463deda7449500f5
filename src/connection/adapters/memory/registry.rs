//! In-memory registry of online agent connections.

use crate::connection::{
    domain::{AgentConnection, AgentName},
    ports::{AgentRegistry, AgentRegistryError, AgentRegistryResult, RegistrationOutcome},
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe in-memory agent registry.
///
/// Entries live in a sharded map: a write locks only the shard holding its
/// name, and enumeration read-locks one shard at a time, so listing never
/// blocks writers of other agents for longer than a single shard copy.
/// Re-registering a name swaps the entry in place; concurrent lookups see
/// either the old or the new connection, never a gap.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentRegistry {
    state: Arc<DashMap<AgentName, AgentConnection>>,
}

impl InMemoryAgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRegistry for InMemoryAgentRegistry {
    async fn register(
        &self,
        connection: AgentConnection,
    ) -> AgentRegistryResult<RegistrationOutcome> {
        if !connection.is_online() {
            return Err(AgentRegistryError::NotOnline {
                agent: connection.name().clone(),
                state: connection.state(),
            });
        }

        let previous = self.state.insert(connection.name().clone(), connection);
        Ok(previous.map_or(RegistrationOutcome::Registered, |replaced| {
            RegistrationOutcome::Reconnected(Box::new(replaced))
        }))
    }

    async fn unregister(&self, name: &AgentName) -> AgentRegistryResult<AgentConnection> {
        self.state
            .remove(name)
            .map(|(_, connection)| connection)
            .ok_or_else(|| AgentRegistryError::NotFound(name.clone()))
    }

    async fn get(&self, name: &AgentName) -> AgentRegistryResult<AgentConnection> {
        self.state
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AgentRegistryError::NotFound(name.clone()))
    }

    async fn list(&self) -> AgentRegistryResult<Vec<AgentConnection>> {
        let mut connections: Vec<AgentConnection> = self
            .state
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        connections.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(connections)
    }

    async fn clear(&self) -> AgentRegistryResult<Vec<AgentConnection>> {
        let names: Vec<AgentName> = self.state.iter().map(|entry| entry.key().clone()).collect();
        let mut cleared: Vec<AgentConnection> = names
            .iter()
            .filter_map(|name| self.state.remove(name).map(|(_, connection)| connection))
            .collect();
        cleared.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(cleared)
    }
}

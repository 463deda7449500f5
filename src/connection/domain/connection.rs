//! Agent connection aggregate root.

use super::{
    AgentName, AgentSequence, AgentVersion, ConnectionDomainError, ConnectionId, ConnectionState,
    OsFamily,
};
use crate::connection::channel::SharedChannel;
use chrono::{DateTime, Utc};
use mockable::Clock;

/// Outcome of a successful version handshake.
///
/// Only the handshake negotiator constructs this value, so holding one is
/// proof that the version requirement check passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedAgent {
    version: AgentVersion,
    os_family: OsFamily,
}

impl NegotiatedAgent {
    pub(crate) const fn new(version: AgentVersion, os_family: OsFamily) -> Self {
        Self { version, os_family }
    }

    /// Returns the accepted agent version.
    #[must_use]
    pub const fn version(&self) -> AgentVersion {
        self.version
    }

    /// Returns the operating-system family reported by the agent.
    #[must_use]
    pub const fn os_family(&self) -> OsFamily {
        self.os_family
    }
}

/// A launched agent and its transport channel.
///
/// Clones share the same channel; the registry hands out clones as
/// snapshots of the connection state at the time of the call.
#[derive(Debug, Clone)]
pub struct AgentConnection {
    id: ConnectionId,
    name: AgentName,
    sequence: AgentSequence,
    channel: SharedChannel,
    state: ConnectionState,
    version: Option<AgentVersion>,
    os_family: OsFamily,
    launched_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AgentConnection {
    /// Creates a connection in the `connecting` state.
    #[must_use]
    pub fn new(
        name: AgentName,
        sequence: AgentSequence,
        channel: SharedChannel,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: ConnectionId::new(),
            name,
            sequence,
            channel,
            state: ConnectionState::Connecting,
            version: None,
            os_family: OsFamily::Unknown,
            launched_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the agent name.
    #[must_use]
    pub const fn name(&self) -> &AgentName {
        &self.name
    }

    /// Returns the launch sequence number.
    #[must_use]
    pub const fn sequence(&self) -> AgentSequence {
        self.sequence
    }

    /// Returns the shared transport channel.
    #[must_use]
    pub const fn channel(&self) -> &SharedChannel {
        &self.channel
    }

    /// Returns the connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns whether the agent is online.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.state.is_online()
    }

    /// Returns the negotiated agent version, once the handshake passed.
    #[must_use]
    pub const fn version(&self) -> Option<AgentVersion> {
        self.version
    }

    /// Returns the agent operating-system family.
    #[must_use]
    pub const fn os_family(&self) -> OsFamily {
        self.os_family
    }

    /// Returns the launch timestamp.
    #[must_use]
    pub const fn launched_at(&self) -> DateTime<Utc> {
        self.launched_at
    }

    /// Returns the latest state change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Marks the channel as open and the handshake as started.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionDomainError::InvalidStateTransition`] when the
    /// transition is not allowed.
    pub fn begin_handshake(&mut self, clock: &impl Clock) -> Result<(), ConnectionDomainError> {
        self.transition_to(ConnectionState::Handshaking, clock)
    }

    /// Marks the agent online with its negotiated version and platform.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionDomainError::InvalidStateTransition`] unless the
    /// connection is handshaking.
    pub fn mark_online(
        &mut self,
        negotiated: NegotiatedAgent,
        clock: &impl Clock,
    ) -> Result<(), ConnectionDomainError> {
        self.transition_to(ConnectionState::Online, clock)?;
        self.version = Some(negotiated.version());
        self.os_family = negotiated.os_family();
        Ok(())
    }

    /// Marks the handshake as rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionDomainError::InvalidStateTransition`] unless the
    /// connection is handshaking.
    pub fn mark_rejected(&mut self, clock: &impl Clock) -> Result<(), ConnectionDomainError> {
        self.transition_to(ConnectionState::Rejected, clock)
    }

    /// Marks the connection as disconnected.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionDomainError::InvalidStateTransition`] when the
    /// connection already reached a terminal state.
    pub fn mark_disconnected(&mut self, clock: &impl Clock) -> Result<(), ConnectionDomainError> {
        self.transition_to(ConnectionState::Disconnected, clock)
    }

    fn transition_to(
        &mut self,
        target_state: ConnectionState,
        clock: &impl Clock,
    ) -> Result<(), ConnectionDomainError> {
        if !self.state.can_transition_to(target_state) {
            return Err(ConnectionDomainError::InvalidStateTransition {
                from: self.state.as_str().to_owned(),
                to: target_state.as_str().to_owned(),
            });
        }

        self.state = target_state;
        self.updated_at = clock.utc();
        Ok(())
    }
}

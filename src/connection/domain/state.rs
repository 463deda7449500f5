//! Connection state machine for agents.

use super::ParseConnectionStateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an agent connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// The agent process is being launched.
    Connecting,
    /// The channel is open and the version handshake is in progress.
    Handshaking,
    /// The handshake passed and the agent is usable.
    Online,
    /// The handshake failed; the channel has been closed.
    Rejected,
    /// The agent was online and has since been disconnected.
    Disconnected,
}

impl ConnectionState {
    /// Returns the canonical text representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Online => "online",
            Self::Rejected => "rejected",
            Self::Disconnected => "disconnected",
        }
    }

    /// Returns whether monitors and work may target the agent.
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }

    /// Returns whether the state is final.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Disconnected)
    }

    /// Returns whether transition to `target` is allowed.
    ///
    /// `Online` is reachable only from `Handshaking`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Connecting, Self::Handshaking | Self::Disconnected)
                | (
                    Self::Handshaking,
                    Self::Online | Self::Rejected | Self::Disconnected
                )
                | (Self::Online, Self::Disconnected)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ConnectionState {
    type Error = ParseConnectionStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "connecting" => Ok(Self::Connecting),
            "handshaking" => Ok(Self::Handshaking),
            "online" => Ok(Self::Online),
            "rejected" => Ok(Self::Rejected),
            "disconnected" => Ok(Self::Disconnected),
            _ => Err(ParseConnectionStateError(value.to_owned())),
        }
    }
}

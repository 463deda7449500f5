//! Error types for connection domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing connection domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionDomainError {
    /// The agent name is empty after trimming.
    #[error("agent name must not be empty")]
    EmptyAgentName,

    /// The agent name contains characters outside `[A-Za-z0-9._-]`.
    #[error(
        "agent name '{0}' contains invalid characters (only alphanumeric, '.', '_' and '-' allowed)"
    )]
    InvalidAgentName(String),

    /// The agent name exceeds the 100-character limit.
    #[error("agent name exceeds 100 character limit: {0}")]
    AgentNameTooLong(String),

    /// A version string is not in `major.minor.patch` form.
    #[error("malformed agent version '{0}' (expected major.minor.patch)")]
    MalformedVersion(String),

    /// The launch executable is empty after trimming.
    #[error("launch executable must not be empty")]
    EmptyExecutable,

    /// The agent binary path is empty after trimming.
    #[error("agent binary path must not be empty")]
    EmptyAgentBinary,

    /// The launch command template is empty after trimming.
    #[error("launch command template must not be empty")]
    EmptyCommandTemplate,

    /// The debug flag prefix is empty after trimming.
    #[error("debug flag prefix must not be empty")]
    EmptyDebugFlagPrefix,

    /// The debug port for an agent sequence does not fit in a TCP port.
    #[error("debug port {base} + {sequence} exceeds 65535")]
    DebugPortOverflow {
        /// Configured base port.
        base: u16,
        /// Agent sequence number.
        sequence: u32,
    },

    /// Transitioning between two connection states is invalid.
    #[error("invalid agent connection transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Current connection state.
        from: String,
        /// Requested target state.
        to: String,
    },
}

/// Error returned while parsing a connection state from text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown agent connection state: {0}")]
pub struct ParseConnectionStateError(pub String);

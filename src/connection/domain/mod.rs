//! Domain model for agent connections.
//!
//! The connection domain models agent identity, protocol versions and the
//! minimal supported version, the connection state machine, and launch
//! configuration. Process and transport concerns remain outside this
//! boundary apart from the shared channel handle each connection owns.

mod connection;
mod error;
mod ids;
mod launch;
mod platform;
mod state;
mod version;

pub use connection::{AgentConnection, NegotiatedAgent};
pub use error::{ConnectionDomainError, ParseConnectionStateError};
pub use ids::{AgentName, AgentSequence, ConnectionId};
pub use launch::{
    DEFAULT_COMMAND_TEMPLATE, DEFAULT_DEBUG_FLAG_PREFIX, DebugPortConfig, LaunchConfig,
};
pub use platform::OsFamily;
pub use state::ConnectionState;
pub use version::{AgentVersion, MINIMAL_SUPPORTED_VERSION, VersionRequirement};

//! Shared fixtures for unit tests.

use crate::connection::{
    channel::AgentChannel,
    domain::{
        AgentConnection, AgentName, AgentSequence, MINIMAL_SUPPORTED_VERSION, NegotiatedAgent,
        OsFamily,
    },
};
use mockable::DefaultClock;
use tokio::io::{DuplexStream, duplex, split};

/// Builds a connection whose channel is the controller end of an in-memory
/// pipe. The agent end is returned so callers decide whether it stays open.
pub(crate) fn connection_in_state(
    name: &str,
    sequence: u32,
    online: bool,
) -> (AgentConnection, DuplexStream) {
    let (controller_side, agent_side) = duplex(1024);
    let (reader, writer) = split(controller_side);
    let channel = AgentChannel::new(reader, writer).into_shared();
    let mut connection = AgentConnection::new(
        AgentName::new(name).expect("valid agent name"),
        AgentSequence::new(sequence),
        channel,
        &DefaultClock,
    );
    if online {
        connection
            .begin_handshake(&DefaultClock)
            .expect("connecting agents may handshake");
        connection
            .mark_online(
                NegotiatedAgent::new(MINIMAL_SUPPORTED_VERSION, OsFamily::Unix),
                &DefaultClock,
            )
            .expect("handshaking agents may go online");
    }
    (connection, agent_side)
}

/// Builds an online connection with a detached agent end.
pub(crate) fn online_connection(name: &str, sequence: u32) -> AgentConnection {
    connection_in_state(name, sequence, true).0
}

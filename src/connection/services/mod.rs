//! Application services for agent handshakes and connection lifecycle.

mod handshake;
mod lifecycle;

pub use handshake::{
    DEFAULT_CAPABILITY_TIMEOUT, DEFAULT_HANDSHAKE_TIMEOUT, HandshakeError, HandshakeNegotiator,
};
pub use lifecycle::{AgentConnectionService, ConnectionServiceError, ConnectionServiceResult};

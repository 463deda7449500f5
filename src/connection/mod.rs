//! Agent launch, version handshake, and registry for connected agents.
//!
//! An agent is started by an [`ports::AgentLauncher`], gated by the
//! [`services::HandshakeNegotiator`] against the minimal supported version,
//! and tracked in an [`ports::AgentRegistry`] while it is online. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Transport framing in [`channel`] and wire vocabulary in [`protocol`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod channel;
pub mod domain;
pub mod ports;
pub mod protocol;
pub mod services;

#[cfg(test)]
mod tests;

//! Agentgate: controller-side agent connection and health monitoring.
//!
//! This crate launches agent processes, gates them behind a version
//! handshake, tracks connected agents in a registry, and dispatches
//! pluggable health monitors against every online agent.
//!
//! # Architecture
//!
//! Agentgate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (processes, memory, etc.)
//!
//! # Modules
//!
//! - [`connection`]: Agent launch, handshake, and registry
//! - [`monitor`]: Monitor catalog, dispatch, and scheduling
//! - [`settings`]: Controller configuration
//! - [`telemetry`]: Tracing subscriber installation

pub mod connection;
pub mod monitor;
pub mod settings;
pub mod shell;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

//! Pluggable health monitors dispatched against online agents.
//!
//! Monitors implement [`ports::Monitor`] and are collected once in a
//! [`services::MonitorCatalog`]. The [`services::MonitorDispatcher`] runs
//! each monitor against each online agent, isolating failures per
//! (monitor, agent) cell, and aggregates a [`domain::MonitorReport`]. The
//! module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

//! Unit tests for the connection module.
//!
//! Tests cover connection state rules, registry semantics, and the
//! launch-handshake-register flow against simulated agents.

mod registry_tests;
mod service_tests;

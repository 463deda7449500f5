//! Unit tests for the monitor module.
//!
//! Tests cover descriptor validation, dispatch fault isolation, timeouts,
//! cancellation, the built-in monitors, and the channel probe.

mod builtin_tests;
mod support;

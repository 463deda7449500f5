//! Per-cell monitor outcomes.

use crate::connection::protocol::DiskLocation;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Measurement produced by a successful check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonitorValue {
    /// Operating system and CPU architecture reported by the agent.
    Architecture {
        /// Agent description, e.g. `linux (x86_64)`.
        description: String,
    },
    /// Agent clock minus controller clock.
    ClockDifference {
        /// Signed difference in milliseconds.
        millis: i64,
    },
    /// Free space at a disk location.
    DiskSpace {
        /// Measured location.
        location: DiskLocation,
        /// Free bytes reported by the agent.
        free_bytes: u64,
        /// Configured warning threshold.
        threshold_bytes: u64,
        /// Whether free space is below the threshold.
        below_threshold: bool,
    },
    /// Round-trip time of a ping.
    ResponseTime {
        /// Elapsed milliseconds.
        millis: u64,
    },
    /// Free-form value produced by a custom monitor.
    Custom {
        /// Value payload.
        value: serde_json::Value,
    },
}

impl MonitorValue {
    /// Builds a disk-space value, deriving the threshold flag.
    #[must_use]
    pub const fn disk_space(location: DiskLocation, free_bytes: u64, threshold_bytes: u64) -> Self {
        Self::DiskSpace {
            location,
            free_bytes,
            threshold_bytes,
            below_threshold: free_bytes < threshold_bytes,
        }
    }
}

/// Why a check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorFailure {
    /// An asynchronous check exceeded its bound and was abandoned.
    Timeout(Duration),
    /// The check returned an error.
    Fault(String),
    /// The check panicked.
    Panicked(String),
}

impl fmt::Display for MonitorFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(bound) => write!(formatter, "timed out after {bound:?}"),
            Self::Fault(cause) => write!(formatter, "check failed: {cause}"),
            Self::Panicked(message) => write!(formatter, "check panicked: {message}"),
        }
    }
}

/// Outcome of one monitor against one agent.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorResult {
    /// The check produced a value.
    Success(MonitorValue),
    /// The check failed; the failure is confined to this cell.
    Failed(MonitorFailure),
    /// The check declined to measure, or the dispatch was cancelled.
    Skipped(String),
    /// The agent or platform has no implementation of the check.
    IgnoredNoImplementation(String),
}

impl MonitorResult {
    /// Returns the value of a successful check.
    #[must_use]
    pub const fn value(&self) -> Option<&MonitorValue> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Returns whether the check succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns whether the check failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns whether the check was skipped.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// Returns whether the check has no implementation for the agent.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self, Self::IgnoredNoImplementation(_))
    }
}

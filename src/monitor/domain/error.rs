//! Error types for monitor domain validation.

use thiserror::Error;

/// Errors returned while building monitor descriptors and catalogs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MonitorDomainError {
    /// The monitor name is empty after trimming.
    #[error("monitor name must not be empty")]
    EmptyName,

    /// The monitor name contains characters outside `[a-z0-9_]`.
    #[error("invalid monitor name '{0}': use lowercase letters, digits, and underscores")]
    InvalidName(String),

    /// The monitor name exceeds the maximum length.
    #[error("monitor name '{0}' exceeds the maximum length")]
    NameTooLong(String),

    /// An asynchronous monitor was given a zero timeout.
    #[error("asynchronous monitor '{0}' requires a positive timeout")]
    ZeroTimeout(String),

    /// A monitor with the same name is already registered.
    #[error("monitor '{0}' is already registered")]
    DuplicateMonitor(String),
}

//! Monitor identity and execution mode.

use super::MonitorDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Maximum monitor name length in bytes.
pub const MAX_MONITOR_NAME_LENGTH: usize = 100;

/// Default bound for asynchronous monitors.
pub const DEFAULT_ASYNC_TIMEOUT: Duration = Duration::from_secs(10);

/// Validated monitor name, unique within a catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonitorName(String);

impl MonitorName {
    /// Creates a validated monitor name.
    ///
    /// The input is trimmed; only `[a-z0-9_]` is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, MonitorDomainError> {
        let normalized = value.into().trim().to_owned();

        if normalized.is_empty() {
            return Err(MonitorDomainError::EmptyName);
        }

        let is_valid = normalized
            .bytes()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'_');
        if !is_valid {
            return Err(MonitorDomainError::InvalidName(normalized));
        }

        if normalized.len() > MAX_MONITOR_NAME_LENGTH {
            return Err(MonitorDomainError::NameTooLong(normalized));
        }

        Ok(Self(normalized))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MonitorName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for MonitorName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl TryFrom<String> for MonitorName {
    type Error = MonitorDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MonitorName> for String {
    fn from(value: MonitorName) -> Self {
        value.0
    }
}

/// How the dispatcher runs a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Runs inline in the dispatching task.
    Synchronous,
    /// Runs as an independent task bounded by `timeout`.
    Asynchronous {
        /// Time after which the unit is abandoned.
        timeout: Duration,
    },
}

impl ExecutionMode {
    /// Returns the timeout of asynchronous monitors.
    #[must_use]
    pub const fn timeout(self) -> Option<Duration> {
        match self {
            Self::Synchronous => None,
            Self::Asynchronous { timeout } => Some(timeout),
        }
    }

    /// Returns whether the monitor runs as an independent task.
    #[must_use]
    pub const fn is_asynchronous(self) -> bool {
        matches!(self, Self::Asynchronous { .. })
    }
}

/// Identity and execution policy of a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorDescriptor {
    name: MonitorName,
    display_name: String,
    mode: ExecutionMode,
}

impl MonitorDescriptor {
    /// Creates a descriptor for a monitor that runs inline.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError`] when the name is invalid.
    pub fn synchronous(
        name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<Self, MonitorDomainError> {
        Ok(Self {
            name: MonitorName::new(name)?,
            display_name: display_name.into(),
            mode: ExecutionMode::Synchronous,
        })
    }

    /// Creates a descriptor for a monitor that runs with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError::ZeroTimeout`] for a zero bound and other
    /// [`MonitorDomainError`] variants when the name is invalid.
    pub fn asynchronous(
        name: impl Into<String>,
        display_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MonitorDomainError> {
        let name = MonitorName::new(name)?;
        if timeout.is_zero() {
            return Err(MonitorDomainError::ZeroTimeout(name.into()));
        }
        Ok(Self {
            name,
            display_name: display_name.into(),
            mode: ExecutionMode::Asynchronous { timeout },
        })
    }

    /// Returns the monitor name.
    #[must_use]
    pub const fn name(&self) -> &MonitorName {
        &self.name
    }

    /// Returns the human-readable monitor name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the execution mode.
    #[must_use]
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }
}

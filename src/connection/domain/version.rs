//! Agent protocol versions and the minimal supported version gate.

use super::ConnectionDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest agent version accepted when no explicit requirement is configured.
pub const MINIMAL_SUPPORTED_VERSION: AgentVersion = AgentVersion::new(3, 14, 0);

/// Agent build version in `major.minor.patch` form.
///
/// Ordering compares the components numerically, so `3.10.0` sorts before
/// `3.14.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentVersion {
    major: u64,
    minor: u64,
    patch: u64,
}

impl AgentVersion {
    /// Creates a version from its numeric components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a `major.minor.patch` version string.
    ///
    /// Surrounding whitespace is ignored. Each component must consist of
    /// ASCII digits only.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionDomainError::MalformedVersion`] carrying the raw
    /// input when the string is not a numeric triple.
    pub fn parse(value: &str) -> Result<Self, ConnectionDomainError> {
        let malformed = || ConnectionDomainError::MalformedVersion(value.to_owned());
        let mut components = value.trim().split('.').map(|component| {
            if component.is_empty() || !component.bytes().all(|byte| byte.is_ascii_digit()) {
                return None;
            }
            component.parse::<u64>().ok()
        });

        let major = components.next().flatten().ok_or_else(malformed)?;
        let minor = components.next().flatten().ok_or_else(malformed)?;
        let patch = components.next().flatten().ok_or_else(malformed)?;
        if components.next().is_some() {
            return Err(malformed());
        }

        Ok(Self::new(major, minor, patch))
    }

    /// Returns the major component.
    #[must_use]
    pub const fn major(self) -> u64 {
        self.major
    }

    /// Returns the minor component.
    #[must_use]
    pub const fn minor(self) -> u64 {
        self.minor
    }

    /// Returns the patch component.
    #[must_use]
    pub const fn patch(self) -> u64 {
        self.patch
    }
}

impl fmt::Display for AgentVersion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for AgentVersion {
    type Err = ConnectionDomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for AgentVersion {
    type Error = ConnectionDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AgentVersion> for String {
    fn from(value: AgentVersion) -> Self {
        value.to_string()
    }
}

/// The minimal agent version a controller accepts.
///
/// Built once from configuration and shared read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionRequirement {
    minimum: AgentVersion,
}

impl VersionRequirement {
    /// Creates a requirement with the given minimum.
    #[must_use]
    pub const fn new(minimum: AgentVersion) -> Self {
        Self { minimum }
    }

    /// Returns the minimal supported version.
    #[must_use]
    pub const fn minimum(&self) -> AgentVersion {
        self.minimum
    }

    /// Returns whether `version` is equal to or newer than the minimum.
    #[must_use]
    pub fn is_satisfied_by(&self, version: AgentVersion) -> bool {
        version >= self.minimum
    }
}

impl Default for VersionRequirement {
    fn default() -> Self {
        Self::new(MINIMAL_SUPPORTED_VERSION)
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, ">= {}", self.minimum)
    }
}

//! Operating-system family reported by agents.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating-system family of an agent host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    /// Unix-like host.
    Unix,
    /// Windows host.
    Windows,
    /// The agent did not report a recognised family.
    #[default]
    Unknown,
}

impl OsFamily {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unix => "unix",
            Self::Windows => "windows",
            Self::Unknown => "unknown",
        }
    }

    /// Interprets a capability frame leniently.
    ///
    /// Unrecognised values map to [`OsFamily::Unknown`].
    #[must_use]
    pub fn from_capability(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "unix" | "linux" | "macos" | "darwin" => Self::Unix,
            "windows" => Self::Windows,
            _ => Self::Unknown,
        }
    }

    /// Returns the family of the host running this process.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(unix) {
            Self::Unix
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

//! Wire vocabulary shared by the controller and agents.
//!
//! After launch the agent sends its version as the first frame and the
//! controller answers [`ACCEPT`] or `REJECT <reason>`. An accepted agent
//! then sends one capability frame naming its operating-system family.
//! Probe requests follow as `<id> <COMMAND> [argument]` and are answered
//! with `<id> OK <payload>`, `<id> ERR <message>` or `<id> UNSUPPORTED`.
//!
//! This module also carries the agent side of the protocol, which backs the
//! `sim_agent` binary and the in-process simulated launcher.

use super::channel::AgentChannel;
use super::domain::OsFamily;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::str::FromStr;

/// Controller reply accepting an agent version.
pub const ACCEPT: &str = "ACCEPT";

/// Controller reply prefix rejecting an agent version.
pub const REJECT: &str = "REJECT";

/// Response status for a successful probe.
pub const OK: &str = "OK";

/// Response status for a failed probe.
pub const ERR: &str = "ERR";

/// Response status for a probe the agent does not implement.
pub const UNSUPPORTED: &str = "UNSUPPORTED";

/// Disk location measured by a free-space probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskLocation {
    /// The agent's root (work) directory.
    Root,
    /// The agent's temporary directory.
    Temp,
}

impl DiskLocation {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Temp => "temp",
        }
    }
}

impl fmt::Display for DiskLocation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Probe command kinds, used to describe what an agent build implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Round-trip liveness check.
    Ping,
    /// Architecture description.
    Arch,
    /// Agent wall clock.
    Clock,
    /// Free disk space.
    Disk,
}

/// A probe request sent to an online agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeCommand {
    /// Round-trip liveness check.
    Ping,
    /// Architecture description.
    Arch,
    /// Agent wall clock in Unix epoch milliseconds.
    Clock,
    /// Free bytes at a disk location.
    Disk(DiskLocation),
}

impl ProbeCommand {
    /// Returns the command kind.
    #[must_use]
    pub const fn kind(self) -> ProbeKind {
        match self {
            Self::Ping => ProbeKind::Ping,
            Self::Arch => ProbeKind::Arch,
            Self::Clock => ProbeKind::Clock,
            Self::Disk(_) => ProbeKind::Disk,
        }
    }

    /// Formats the request frame for `request_id`.
    #[must_use]
    pub fn to_frame(self, request_id: u64) -> String {
        match self {
            Self::Ping => format!("{request_id} PING"),
            Self::Arch => format!("{request_id} ARCH"),
            Self::Clock => format!("{request_id} CLOCK"),
            Self::Disk(location) => format!("{request_id} DISK {location}"),
        }
    }
}

impl fmt::Display for ProbeCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ping => formatter.write_str("PING"),
            Self::Arch => formatter.write_str("ARCH"),
            Self::Clock => formatter.write_str("CLOCK"),
            Self::Disk(location) => write!(formatter, "DISK {location}"),
        }
    }
}

impl FromStr for ProbeCommand {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.split_whitespace();
        let command = match (parts.next(), parts.next()) {
            (Some("PING"), None) => Self::Ping,
            (Some("ARCH"), None) => Self::Arch,
            (Some("CLOCK"), None) => Self::Clock,
            (Some("DISK"), Some("root")) => Self::Disk(DiskLocation::Root),
            (Some("DISK"), Some("temp")) => Self::Disk(DiskLocation::Temp),
            _ => return Err(format!("unknown probe request '{value}'")),
        };
        if parts.next().is_some() {
            return Err(format!("unexpected arguments in probe request '{value}'"));
        }
        Ok(command)
    }
}

/// Behaviour of a simulated agent build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentManifest {
    /// Version reported in the first handshake frame, sent verbatim.
    pub version: String,
    /// Operating-system family sent in the capability frame.
    pub os_family: OsFamily,
    /// Whether the agent sends a capability frame after `ACCEPT`.
    pub sends_capabilities: bool,
    /// Architecture description answered to `ARCH`.
    pub architecture: String,
    /// Offset applied to the agent clock, in milliseconds.
    pub clock_offset_ms: i64,
    /// Free bytes answered to `DISK root`.
    pub root_free_bytes: u64,
    /// Free bytes answered to `DISK temp`.
    pub temp_free_bytes: u64,
    /// Probe kinds this build implements; others answer `UNSUPPORTED`.
    pub supported_probes: BTreeSet<ProbeKind>,
    /// Probe kinds the agent receives but never answers.
    pub unresponsive_probes: BTreeSet<ProbeKind>,
}

impl AgentManifest {
    /// Creates a manifest for an agent reporting `version`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    /// Answers one probe request frame.
    ///
    /// Returns `None` for requests the agent leaves unanswered.
    #[must_use]
    pub fn respond(&self, frame: &str) -> Option<String> {
        let (request_id, body) = frame.trim().split_once(' ').unwrap_or((frame.trim(), ""));
        let command = match body.parse::<ProbeCommand>() {
            Ok(command) => command,
            Err(reason) => return Some(format!("{request_id} {ERR} {reason}")),
        };

        let kind = command.kind();
        if self.unresponsive_probes.contains(&kind) {
            return None;
        }
        if !self.supported_probes.contains(&kind) {
            return Some(format!("{request_id} {UNSUPPORTED}"));
        }

        let payload = match command {
            ProbeCommand::Ping => "PONG".to_owned(),
            ProbeCommand::Arch => self.architecture.clone(),
            ProbeCommand::Clock => Utc::now()
                .timestamp_millis()
                .saturating_add(self.clock_offset_ms)
                .to_string(),
            ProbeCommand::Disk(DiskLocation::Root) => self.root_free_bytes.to_string(),
            ProbeCommand::Disk(DiskLocation::Temp) => self.temp_free_bytes.to_string(),
        };
        Some(format!("{request_id} {OK} {payload}"))
    }

    /// Runs the agent side of the protocol until the controller hangs up or
    /// rejects the agent.
    ///
    /// # Errors
    ///
    /// Returns transport errors from the channel.
    pub async fn serve(&self, channel: &AgentChannel) -> io::Result<()> {
        channel.write_frame(&self.version).await?;
        let Some(verdict) = channel.read_frame().await? else {
            return Ok(());
        };
        if verdict != ACCEPT {
            return Ok(());
        }

        if self.sends_capabilities {
            channel.write_frame(self.os_family.as_str()).await?;
        }

        while let Some(frame) = channel.read_frame().await? {
            if let Some(response) = self.respond(&frame) {
                channel.write_frame(&response).await?;
            }
        }
        Ok(())
    }
}

impl Default for AgentManifest {
    fn default() -> Self {
        Self {
            version: super::domain::MINIMAL_SUPPORTED_VERSION.to_string(),
            os_family: OsFamily::current(),
            sends_capabilities: true,
            architecture: format!("{} ({})", std::env::consts::OS, std::env::consts::ARCH),
            clock_offset_ms: 0,
            root_free_bytes: 10 * 1024 * 1024 * 1024,
            temp_free_bytes: 4 * 1024 * 1024 * 1024,
            supported_probes: [
                ProbeKind::Ping,
                ProbeKind::Arch,
                ProbeKind::Clock,
                ProbeKind::Disk,
            ]
            .into_iter()
            .collect(),
            unresponsive_probes: BTreeSet::new(),
        }
    }
}

//! Controller configuration with environment overrides.

use crate::connection::domain::{AgentVersion, ConnectionDomainError, LaunchConfig, VersionRequirement};
use crate::connection::services::HandshakeNegotiator;
use crate::monitor::adapters::DEFAULT_DISK_SPACE_THRESHOLD;
use crate::monitor::services::{
    DEFAULT_MAX_CONCURRENT_UNITS, MonitorCatalog, MonitorDispatcher, StandardMonitorConfig,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Overrides the minimal supported agent version.
pub const MIN_AGENT_VERSION_ENV: &str = "AGENTGATE_MIN_AGENT_VERSION";
/// Overrides the debug-port base; `0` disables debugging.
pub const DEBUG_PORT_ENV: &str = "AGENTGATE_DEBUG_PORT";
/// Overrides the handshake timeout in milliseconds.
pub const HANDSHAKE_TIMEOUT_ENV: &str = "AGENTGATE_HANDSHAKE_TIMEOUT_MS";

/// Errors returned while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings document is not valid JSON for [`ControllerSettings`].
    #[error("invalid settings document: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override could not be parsed.
    #[error("invalid value '{value}' for {variable}: {reason}")]
    InvalidOverride {
        /// Environment variable name.
        variable: &'static str,
        /// Raw value.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// A duration setting is zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Tunables of the controller.
///
/// Every field has a default, so an empty JSON object is a valid document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerSettings {
    /// Oldest agent version accepted by the handshake.
    pub min_agent_version: AgentVersion,
    /// Time allowed for an agent's version frame, in milliseconds.
    pub handshake_timeout_ms: u64,
    /// Time allowed for the capability frame, in milliseconds.
    pub capability_timeout_ms: u64,
    /// Base of per-agent debug ports; `0` disables the debug flag.
    pub debug_port_base: u16,
    /// Asynchronous monitor units allowed to run at once.
    pub max_concurrent_monitors: usize,
    /// Bound of the standard asynchronous monitors, in milliseconds.
    pub monitor_timeout_ms: u64,
    /// Period between monitor sweeps, in milliseconds.
    pub monitor_interval_ms: u64,
    /// Free-space level below which disk monitors flag an agent.
    pub disk_space_threshold_bytes: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            min_agent_version: VersionRequirement::default().minimum(),
            handshake_timeout_ms: 30_000,
            capability_timeout_ms: 1_000,
            debug_port_base: 0,
            max_concurrent_monitors: DEFAULT_MAX_CONCURRENT_UNITS,
            monitor_timeout_ms: 10_000,
            monitor_interval_ms: 60_000,
            disk_space_threshold_bytes: DEFAULT_DISK_SPACE_THRESHOLD,
        }
    }
}

impl ControllerSettings {
    /// Parses and validates a JSON settings document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for malformed documents or invalid values.
    pub fn from_json(document: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(document)?;
        settings.validate()
    }

    /// Applies overrides looked up by variable name.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidOverride`] when a present value does
    /// not parse, and [`SettingsError::ZeroDuration`] when the result is
    /// invalid.
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        if let Some(value) = lookup(MIN_AGENT_VERSION_ENV) {
            self.min_agent_version = parse_override(MIN_AGENT_VERSION_ENV, value)?;
        }
        if let Some(value) = lookup(DEBUG_PORT_ENV) {
            self.debug_port_base = parse_override(DEBUG_PORT_ENV, value)?;
        }
        if let Some(value) = lookup(HANDSHAKE_TIMEOUT_ENV) {
            self.handshake_timeout_ms = parse_override(HANDSHAKE_TIMEOUT_ENV, value)?;
        }
        self.validate()
    }

    /// Applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ControllerSettings::apply_overrides`].
    pub fn with_process_env(self) -> Result<Self, SettingsError> {
        self.apply_overrides(|variable| std::env::var(variable).ok())
    }

    fn validate(self) -> Result<Self, SettingsError> {
        for (field, value) in [
            ("handshake_timeout_ms", self.handshake_timeout_ms),
            ("capability_timeout_ms", self.capability_timeout_ms),
            ("monitor_timeout_ms", self.monitor_timeout_ms),
            ("monitor_interval_ms", self.monitor_interval_ms),
        ] {
            if value == 0 {
                return Err(SettingsError::ZeroDuration(field));
            }
        }
        Ok(self)
    }

    /// Returns the version gate.
    #[must_use]
    pub const fn version_requirement(&self) -> VersionRequirement {
        VersionRequirement::new(self.min_agent_version)
    }

    /// Builds the handshake negotiator.
    #[must_use]
    pub const fn handshake_negotiator(&self) -> HandshakeNegotiator {
        HandshakeNegotiator::new(self.version_requirement())
            .with_timeout(Duration::from_millis(self.handshake_timeout_ms))
            .with_capability_timeout(Duration::from_millis(self.capability_timeout_ms))
    }

    /// Builds a launch configuration carrying the configured debug-port base.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionDomainError`] when either path is empty.
    pub fn launch_config(
        &self,
        executable: impl Into<String>,
        agent_binary: impl Into<String>,
    ) -> Result<LaunchConfig, ConnectionDomainError> {
        Ok(LaunchConfig::new(executable, agent_binary)?.with_debug_port_base(self.debug_port_base))
    }

    /// Returns parameters for [`MonitorCatalog::standard`].
    #[must_use]
    pub const fn standard_monitors(&self) -> StandardMonitorConfig {
        StandardMonitorConfig {
            timeout: Duration::from_millis(self.monitor_timeout_ms),
            disk_threshold_bytes: self.disk_space_threshold_bytes,
        }
    }

    /// Builds a dispatcher over `catalog` with the configured worker bound.
    #[must_use]
    pub fn monitor_dispatcher(&self, catalog: MonitorCatalog) -> MonitorDispatcher {
        MonitorDispatcher::with_max_concurrent_units(catalog, self.max_concurrent_monitors)
    }

    /// Returns the period between monitor sweeps.
    #[must_use]
    pub const fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }
}

fn parse_override<T>(variable: &'static str, value: String) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|err| SettingsError::InvalidOverride {
            variable,
            reason: err.to_string(),
            value,
        })
}

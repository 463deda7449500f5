//! Launch configuration value objects for agent processes.

use super::{AgentSequence, ConnectionDomainError};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Command template used when none is configured.
///
/// Recognised substitutions are `executable`, `debug` and `agent_binary`.
pub const DEFAULT_COMMAND_TEMPLATE: &str = "{{ executable }}{{ debug }} -jar {{ agent_binary }}";

/// Remote-debug argument prefix; the debug port is appended to it.
pub const DEFAULT_DEBUG_FLAG_PREFIX: &str =
    "-Xdebug -Xrunjdwp:transport=dt_socket,server=y,address=";

/// Remote-debug settings for launched agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugPortConfig {
    base_port: u16,
    flag_prefix: String,
}

impl DebugPortConfig {
    /// Creates debug settings for a positive base port.
    ///
    /// Returns `None` when `base_port` is zero, which disables remote
    /// debugging.
    #[must_use]
    pub fn new(base_port: u16) -> Option<Self> {
        (base_port > 0).then(|| Self {
            base_port,
            flag_prefix: DEFAULT_DEBUG_FLAG_PREFIX.to_owned(),
        })
    }

    /// Replaces the debug flag prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionDomainError::EmptyDebugFlagPrefix`] when the
    /// prefix is empty after trimming.
    pub fn with_flag_prefix(
        mut self,
        prefix: impl Into<String>,
    ) -> Result<Self, ConnectionDomainError> {
        let normalized = prefix.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ConnectionDomainError::EmptyDebugFlagPrefix);
        }
        self.flag_prefix = normalized;
        Ok(self)
    }

    /// Returns the base port.
    #[must_use]
    pub const fn base_port(&self) -> u16 {
        self.base_port
    }

    /// Returns the flag prefix.
    #[must_use]
    pub fn flag_prefix(&self) -> &str {
        &self.flag_prefix
    }

    /// Returns the debug port for the agent with the given sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionDomainError::DebugPortOverflow`] when
    /// `base + sequence` exceeds `u16::MAX`.
    pub fn port_for(&self, sequence: AgentSequence) -> Result<u16, ConnectionDomainError> {
        let overflow = || ConnectionDomainError::DebugPortOverflow {
            base: self.base_port,
            sequence: sequence.value(),
        };
        let offset = u16::try_from(sequence.value()).map_err(|_| overflow())?;
        self.base_port.checked_add(offset).ok_or_else(overflow)
    }

    /// Returns the full debug flag for the agent with the given sequence.
    ///
    /// # Errors
    ///
    /// Propagates [`DebugPortConfig::port_for`] failures.
    pub fn flag_for(&self, sequence: AgentSequence) -> Result<String, ConnectionDomainError> {
        Ok(format!("{}{}", self.flag_prefix, self.port_for(sequence)?))
    }
}

/// How to start an agent process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    command_template: String,
    executable: Utf8PathBuf,
    agent_binary: Utf8PathBuf,
    debug: Option<DebugPortConfig>,
    working_directory: Option<Utf8PathBuf>,
    env: BTreeMap<String, String>,
}

impl LaunchConfig {
    /// Creates a launch configuration with the default command template.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionDomainError::EmptyExecutable`] or
    /// [`ConnectionDomainError::EmptyAgentBinary`] when either path is empty
    /// after trimming.
    pub fn new(
        executable: impl Into<String>,
        agent_binary: impl Into<String>,
    ) -> Result<Self, ConnectionDomainError> {
        let normalized_executable = executable.into().trim().to_owned();
        if normalized_executable.is_empty() {
            return Err(ConnectionDomainError::EmptyExecutable);
        }

        let normalized_binary = agent_binary.into().trim().to_owned();
        if normalized_binary.is_empty() {
            return Err(ConnectionDomainError::EmptyAgentBinary);
        }

        Ok(Self {
            command_template: DEFAULT_COMMAND_TEMPLATE.to_owned(),
            executable: Utf8PathBuf::from(normalized_executable),
            agent_binary: Utf8PathBuf::from(normalized_binary),
            debug: None,
            working_directory: None,
            env: BTreeMap::new(),
        })
    }

    /// Replaces the command template.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionDomainError::EmptyCommandTemplate`] when the
    /// template is empty after trimming.
    pub fn with_command_template(
        mut self,
        template: impl Into<String>,
    ) -> Result<Self, ConnectionDomainError> {
        let normalized = template.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ConnectionDomainError::EmptyCommandTemplate);
        }
        self.command_template = normalized;
        Ok(self)
    }

    /// Enables remote debugging from `base_port`; zero disables it.
    #[must_use]
    pub fn with_debug_port_base(mut self, base_port: u16) -> Self {
        self.debug = DebugPortConfig::new(base_port);
        self
    }

    /// Replaces the remote-debug settings.
    #[must_use]
    pub fn with_debug(mut self, debug: Option<DebugPortConfig>) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the working directory of launched agents.
    #[must_use]
    pub fn with_working_directory(mut self, directory: impl Into<Utf8PathBuf>) -> Self {
        self.working_directory = Some(directory.into());
        self
    }

    /// Replaces environment variables passed to launched agents.
    #[must_use]
    pub fn with_env(mut self, values: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = values.into_iter().collect();
        self
    }

    /// Returns the command template.
    #[must_use]
    pub fn command_template(&self) -> &str {
        &self.command_template
    }

    /// Returns the executable.
    #[must_use]
    pub fn executable(&self) -> &Utf8Path {
        &self.executable
    }

    /// Returns the agent binary path.
    #[must_use]
    pub fn agent_binary(&self) -> &Utf8Path {
        &self.agent_binary
    }

    /// Returns the remote-debug settings.
    #[must_use]
    pub const fn debug(&self) -> Option<&DebugPortConfig> {
        self.debug.as_ref()
    }

    /// Returns the optional working directory.
    #[must_use]
    pub fn working_directory(&self) -> Option<&Utf8Path> {
        self.working_directory.as_deref()
    }

    /// Returns environment variables.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Returns the debug flag for an agent sequence, if debugging is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionDomainError::DebugPortOverflow`] when the port
    /// would exceed `u16::MAX`.
    pub fn debug_flag(
        &self,
        sequence: AgentSequence,
    ) -> Result<Option<String>, ConnectionDomainError> {
        self.debug
            .as_ref()
            .map(|debug| debug.flag_for(sequence))
            .transpose()
    }
}

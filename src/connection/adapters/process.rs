//! Launcher adapter that starts agents as local OS processes.

use super::CommandLine;
use crate::connection::{
    channel::AgentChannel,
    domain::LaunchConfig,
    ports::{AgentLauncher, LaunchError, LaunchRequest, LaunchResult},
};
use async_trait::async_trait;
use camino::Utf8Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

/// Starts agents through the platform shell.
///
/// The rendered command runs under `sh -c` on Unix and `cmd /C` on Windows.
/// The agent's stdout and stdin become the channel; stderr is inherited so
/// agent diagnostics reach the controller's log.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    config: LaunchConfig,
}

impl ProcessLauncher {
    /// Creates a launcher for the given configuration.
    #[must_use]
    pub const fn new(config: LaunchConfig) -> Self {
        Self { config }
    }

    /// Returns the launch configuration.
    #[must_use]
    pub const fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// Checks the configured paths before anything is spawned.
    ///
    /// A bare executable name is resolved by the shell; an executable given
    /// as a path must exist. The agent binary must be an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::PathInvalid`] describing the first bad path.
    pub fn validate_paths(&self) -> LaunchResult<()> {
        let executable = self.config.executable();
        if is_path_like(executable) && !executable.exists() {
            return Err(LaunchError::path_invalid(
                executable.as_str(),
                "executable does not exist",
            ));
        }

        let agent_binary = self.config.agent_binary();
        if !agent_binary.is_file() {
            return Err(LaunchError::path_invalid(
                agent_binary.as_str(),
                "agent binary is not an existing file",
            ));
        }

        if let Some(directory) = self.config.working_directory()
            && !directory.is_dir()
        {
            return Err(LaunchError::path_invalid(
                directory.as_str(),
                "working directory does not exist",
            ));
        }
        Ok(())
    }

    fn shell_command(command_line: &CommandLine) -> Command {
        if cfg!(windows) {
            let mut command = Command::new("cmd");
            command.arg("/C").arg(command_line.as_str());
            command
        } else {
            let mut command = Command::new("sh");
            command.arg("-c").arg(command_line.as_str());
            command
        }
    }
}

fn is_path_like(executable: &Utf8Path) -> bool {
    executable.components().count() > 1 || executable.is_absolute()
}

#[async_trait]
impl AgentLauncher for ProcessLauncher {
    async fn launch(&self, request: &LaunchRequest) -> LaunchResult<AgentChannel> {
        self.validate_paths()?;
        let command_line = CommandLine::render(&self.config, request.sequence())?;

        let mut command = Self::shell_command(&command_line);
        command
            .envs(self.config.env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(directory) = self.config.working_directory() {
            command.current_dir(directory);
        }

        let mut child = command.spawn().map_err(|err| {
            LaunchError::spawn_failed(request.agent().clone(), command_line.as_str(), err)
        })?;

        let missing_pipe = || {
            LaunchError::spawn_failed(
                request.agent().clone(),
                command_line.as_str(),
                std::io::Error::other("agent stdio pipes were not captured"),
            )
        };
        let stdout = child.stdout.take().ok_or_else(missing_pipe)?;
        let stdin = child.stdin.take().ok_or_else(missing_pipe)?;

        info!(
            agent = %request.agent(),
            sequence = %request.sequence(),
            pid = child.id(),
            debug_port = command_line.debug_port(),
            command = command_line.as_str(),
            "launched agent process"
        );
        Ok(AgentChannel::new(stdout, stdin).with_process(child))
    }
}

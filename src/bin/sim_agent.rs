//! Simulated agent speaking the controller wire protocol over stdio.
//!
//! Usage:
//!
//! ```text
//! sim_agent [flags...] [manifest-path]
//! ```
//!
//! Arguments starting with `-` are accepted and ignored, so the binary can be
//! launched through the default command template including debug flags. The
//! optional JSON file at `manifest-path` deserializes into an
//! [`AgentManifest`]; missing fields take their defaults. A representative
//! manifest is:
//!
//! ```json
//! {
//!   "version": "3.14.0",
//!   "os_family": "unix",
//!   "architecture": "linux (x86_64)",
//!   "supported_probes": ["ping", "arch", "clock"]
//! }
//! ```

use agentgate::connection::protocol::{ACCEPT, AgentManifest};
use agentgate::telemetry::{TelemetryError, init_tracing};
use camino::{Utf8Path, Utf8PathBuf};
use std::env;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that stop the simulated agent.
#[derive(Debug, Error)]
enum SimAgentError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("failed to read manifest {path}: {source}")]
    ManifestRead {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse manifest {path}: {source}")]
    ManifestParse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("stdio failure: {0}")]
    Io(#[from] io::Error),
}

fn main() -> Result<(), SimAgentError> {
    init_tracing("warn")?;
    let args = collect_args()?;
    let manifest = match manifest_path(&args) {
        Some(path) => load_manifest(path)?,
        None => AgentManifest::default(),
    };
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_session(&manifest, stdin.lock(), stdout.lock())?;
    Ok(())
}

fn collect_args() -> Result<Vec<Utf8PathBuf>, SimAgentError> {
    env::args_os()
        .skip(1)
        .map(|arg_os| {
            arg_os
                .into_string()
                .map(Utf8PathBuf::from)
                .map_err(|_| SimAgentError::InvalidArgs("argument is not valid UTF-8".into()))
        })
        .collect()
}

/// Returns the last argument that is not a flag.
fn manifest_path(args: &[Utf8PathBuf]) -> Option<&Utf8Path> {
    args.iter()
        .rev()
        .find(|arg| !arg.as_str().starts_with('-'))
        .map(Utf8PathBuf::as_path)
}

fn load_manifest(path: &Utf8Path) -> Result<AgentManifest, SimAgentError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SimAgentError::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SimAgentError::ManifestParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Runs the agent side of the protocol until the controller hangs up.
fn run_session(
    manifest: &AgentManifest,
    mut input: impl BufRead,
    mut output: impl Write,
) -> io::Result<()> {
    writeln!(output, "{}", manifest.version)?;
    output.flush()?;

    let Some(verdict) = read_line(&mut input)? else {
        return Ok(());
    };
    if verdict != ACCEPT {
        info!(%verdict, "controller refused the session");
        return Ok(());
    }

    if manifest.sends_capabilities {
        writeln!(output, "{}", manifest.os_family.as_str())?;
        output.flush()?;
    }

    while let Some(request) = read_line(&mut input)? {
        debug!(%request, "probe request");
        if let Some(response) = manifest.respond(&request) {
            writeln!(output, "{response}")?;
            output.flush()?;
        }
    }
    Ok(())
}

fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
}

#[cfg(test)]
#[path = "sim_agent/tests.rs"]
mod tests;

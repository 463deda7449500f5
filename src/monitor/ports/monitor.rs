//! The check capability implemented by every monitor.

use super::ProbeError;
use crate::connection::domain::AgentConnection;
use crate::monitor::domain::{MonitorDescriptor, MonitorValue};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for monitor checks.
pub type MonitorCheckResult<T> = Result<T, MonitorCheckError>;

/// A health check run against connected agents.
///
/// The dispatcher decides how `check` is run from the descriptor's execution
/// mode; implementations only measure.
#[async_trait]
pub trait Monitor: Send + Sync {
    /// Returns the monitor's identity and execution mode.
    fn descriptor(&self) -> &MonitorDescriptor;

    /// Measures one online agent.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorCheckError::NoImplementation`] when the agent cannot
    /// answer this check, [`MonitorCheckError::Skipped`] when the measurement
    /// does not apply, and [`MonitorCheckError::Fault`] otherwise.
    async fn check(&self, agent: &AgentConnection) -> MonitorCheckResult<MonitorValue>;
}

/// Typed reasons a check produced no value.
#[derive(Debug, Clone, Error)]
pub enum MonitorCheckError {
    /// No implementation exists for the agent or its platform.
    #[error("no implementation: {0}")]
    NoImplementation(String),

    /// The check declined to measure.
    #[error("skipped: {0}")]
    Skipped(String),

    /// The check failed.
    #[error("monitor fault: {0}")]
    Fault(Arc<dyn std::error::Error + Send + Sync>),
}

impl MonitorCheckError {
    /// Wraps an arbitrary error as a check fault.
    pub fn fault(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Fault(Arc::new(err))
    }
}

impl From<ProbeError> for MonitorCheckError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Unsupported { command } => {
                Self::NoImplementation(format!("agent does not implement {command}"))
            }
            other => Self::fault(other),
        }
    }
}

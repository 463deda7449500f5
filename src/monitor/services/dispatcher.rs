//! Fan-out of monitors across online agents with per-cell fault isolation.

use super::{DispatchCancellation, MonitorCatalog};
use crate::connection::{
    domain::{AgentConnection, AgentName, ConnectionState},
    ports::{AgentRegistry, AgentRegistryError},
};
use crate::monitor::{
    domain::{
        ExecutionMode, MonitorCell, MonitorFailure, MonitorName, MonitorReport, MonitorResult,
        MonitorValue,
    },
    ports::{Monitor, MonitorCheckError, MonitorCheckResult},
};
use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default number of asynchronous units allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_UNITS: usize = 16;

/// Reason recorded for units dropped by a cancelled dispatch.
pub const CANCELLED_REASON: &str = "dispatch cancelled";

/// Errors that prevent a dispatch from starting.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The registry could not be read.
    #[error(transparent)]
    Registry(#[from] AgentRegistryError),

    /// The requested agent is not online.
    #[error("agent {agent} is not online (state {state})")]
    NotOnline {
        /// Agent name.
        agent: AgentName,
        /// Observed connection state.
        state: ConnectionState,
    },
}

/// Result type for dispatcher operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Runs every catalogued monitor against online agents.
///
/// Synchronous monitors run inline, one after another, with panics caught.
/// Asynchronous monitors run as separate tasks, bounded by a semaphore and
/// by their own timeout. A dispatch returns once every unit has produced a
/// result, timed out, or been skipped by cancellation.
///
/// A timed-out unit is aborted at its next suspension point. A check that
/// blocks its thread without yielding keeps running detached until it
/// returns.
#[derive(Debug)]
pub struct MonitorDispatcher {
    catalog: Arc<MonitorCatalog>,
    permits: Arc<Semaphore>,
    ignored_logged: Mutex<HashSet<MonitorName>>,
}

impl MonitorDispatcher {
    /// Creates a dispatcher with [`DEFAULT_MAX_CONCURRENT_UNITS`] workers.
    #[must_use]
    pub fn new(catalog: MonitorCatalog) -> Self {
        Self::with_max_concurrent_units(catalog, DEFAULT_MAX_CONCURRENT_UNITS)
    }

    /// Creates a dispatcher allowing `max_units` asynchronous units at once.
    ///
    /// A bound of zero is raised to one.
    #[must_use]
    pub fn with_max_concurrent_units(catalog: MonitorCatalog, max_units: usize) -> Self {
        Self {
            catalog: Arc::new(catalog),
            permits: Arc::new(Semaphore::new(max_units.max(1))),
            ignored_logged: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &MonitorCatalog {
        &self.catalog
    }

    /// Runs every monitor against every online agent.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Registry`] when the registry cannot be read.
    /// Monitor failures never surface here; they are recorded per cell.
    pub async fn run_all<R>(&self, registry: &R) -> DispatchResult<MonitorReport>
    where
        R: AgentRegistry + ?Sized,
    {
        self.run_all_with_cancel(registry, &DispatchCancellation::never())
            .await
    }

    /// Runs every monitor against every online agent until `cancellation`
    /// fires.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Registry`] when the registry cannot be read.
    pub async fn run_all_with_cancel<R>(
        &self,
        registry: &R,
        cancellation: &DispatchCancellation,
    ) -> DispatchResult<MonitorReport>
    where
        R: AgentRegistry + ?Sized,
    {
        let agents = registry.list().await?;
        Ok(self.dispatch(&agents, cancellation).await)
    }

    /// Runs every monitor against one agent.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Registry`] wrapping
    /// [`AgentRegistryError::NotFound`] for unknown agents and
    /// [`DispatchError::NotOnline`] for agents that are not online.
    pub async fn run_for_agent<R>(
        &self,
        registry: &R,
        agent: &AgentName,
    ) -> DispatchResult<MonitorReport>
    where
        R: AgentRegistry + ?Sized,
    {
        let connection = registry.get(agent).await?;
        if !connection.is_online() {
            return Err(DispatchError::NotOnline {
                agent: agent.clone(),
                state: connection.state(),
            });
        }
        Ok(self
            .dispatch(&[connection], &DispatchCancellation::never())
            .await)
    }

    async fn dispatch(
        &self,
        agents: &[AgentConnection],
        cancellation: &DispatchCancellation,
    ) -> MonitorReport {
        let online: Vec<&AgentConnection> = agents
            .iter()
            .filter(|agent| agent.is_online())
            .collect();
        let mut results = BTreeMap::new();
        let mut pending = BTreeSet::new();
        let mut units = JoinSet::new();

        for monitor in self.catalog.monitors() {
            let ExecutionMode::Asynchronous { timeout: bound } = monitor.descriptor().mode() else {
                continue;
            };
            for agent in &online {
                let cell = cell_for(monitor.as_ref(), agent);
                pending.insert(cell.clone());
                units.spawn(run_bounded(
                    cell,
                    Arc::clone(monitor),
                    (*agent).clone(),
                    bound,
                    Arc::clone(&self.permits),
                ));
            }
        }

        let mut cancelled = false;
        for monitor in self.catalog.monitors() {
            if monitor.descriptor().mode().is_asynchronous() {
                continue;
            }
            for agent in &online {
                let cell = cell_for(monitor.as_ref(), agent);
                cancelled = cancelled || cancellation.is_cancelled();
                let result = if cancelled {
                    MonitorResult::Skipped(CANCELLED_REASON.to_owned())
                } else {
                    run_inline(monitor.as_ref(), agent).await
                };
                self.record(&mut results, cell, result);
            }
        }

        while !cancelled && !pending.is_empty() {
            tokio::select! {
                joined = units.join_next() => match joined {
                    Some(Ok((cell, result))) => {
                        pending.remove(&cell);
                        self.record(&mut results, cell, result);
                    }
                    Some(Err(err)) => debug!(error = %err, "monitor unit ended abnormally"),
                    None => break,
                },
                () = cancellation.cancelled() => cancelled = true,
            }
        }

        if cancelled {
            units.abort_all();
            for cell in pending {
                results.insert(cell, MonitorResult::Skipped(CANCELLED_REASON.to_owned()));
            }
            info!("monitor dispatch cancelled");
        } else {
            for cell in pending {
                let lost = MonitorFailure::Panicked("monitor unit terminated".to_owned());
                self.record(&mut results, cell, MonitorResult::Failed(lost));
            }
        }

        MonitorReport::new(results, cancelled)
    }

    fn record(
        &self,
        results: &mut BTreeMap<MonitorCell, MonitorResult>,
        cell: MonitorCell,
        result: MonitorResult,
    ) {
        if let MonitorResult::IgnoredNoImplementation(reason) = &result {
            let first = self
                .ignored_logged
                .lock()
                .map_or(true, |mut logged| logged.insert(cell.monitor().clone()));
            if first {
                info!(monitor = %cell.monitor(), agent = %cell.agent(), %reason, "monitor ignored: no implementation");
            }
        }
        if let MonitorResult::Failed(failure) = &result {
            debug!(monitor = %cell.monitor(), agent = %cell.agent(), %failure, "monitor failed");
        }
        results.insert(cell, result);
    }
}

fn cell_for(monitor: &dyn Monitor, agent: &AgentConnection) -> MonitorCell {
    MonitorCell::new(monitor.descriptor().name().clone(), agent.name().clone())
}

async fn run_inline(monitor: &dyn Monitor, agent: &AgentConnection) -> MonitorResult {
    match AssertUnwindSafe(monitor.check(agent)).catch_unwind().await {
        Ok(outcome) => classify(outcome),
        Err(payload) => MonitorResult::Failed(MonitorFailure::Panicked(panic_message(
            payload.as_ref(),
        ))),
    }
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn run_bounded(
    cell: MonitorCell,
    monitor: Arc<dyn Monitor>,
    agent: AgentConnection,
    bound: Duration,
    permits: Arc<Semaphore>,
) -> (MonitorCell, MonitorResult) {
    let Ok(_permit) = permits.acquire_owned().await else {
        return (cell, MonitorResult::Skipped(CANCELLED_REASON.to_owned()));
    };

    let mut check = AbortOnDrop(tokio::spawn(async move { monitor.check(&agent).await }));
    let result = match timeout(bound, &mut check.0).await {
        Ok(Ok(outcome)) => classify(outcome),
        Ok(Err(err)) if err.is_panic() => {
            let payload = err.into_panic();
            MonitorResult::Failed(MonitorFailure::Panicked(panic_message(payload.as_ref())))
        }
        Ok(Err(err)) => MonitorResult::Failed(MonitorFailure::Fault(err.to_string())),
        Err(_) => {
            warn!(
                monitor = %cell.monitor(),
                agent = %cell.agent(),
                ?bound,
                "monitor timed out; unit abandoned and may keep running if it never yields"
            );
            MonitorResult::Failed(MonitorFailure::Timeout(bound))
        }
    };
    (cell, result)
}

fn classify(outcome: MonitorCheckResult<MonitorValue>) -> MonitorResult {
    match outcome {
        Ok(value) => MonitorResult::Success(value),
        Err(MonitorCheckError::NoImplementation(reason)) => {
            MonitorResult::IgnoredNoImplementation(reason)
        }
        Err(MonitorCheckError::Skipped(reason)) => MonitorResult::Skipped(reason),
        Err(MonitorCheckError::Fault(cause)) => {
            MonitorResult::Failed(MonitorFailure::Fault(cause.to_string()))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_owned())
}

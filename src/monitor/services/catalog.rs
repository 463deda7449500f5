//! Registry of monitors built once at controller start-up.

use crate::monitor::{
    adapters::{
        ArchitectureMonitor, ClockMonitor, DEFAULT_DISK_SPACE_THRESHOLD, DiskSpaceMonitor,
        ResponseTimeMonitor,
    },
    domain::{DEFAULT_ASYNC_TIMEOUT, MonitorDomainError, MonitorName},
    ports::{AgentProbe, Monitor},
};
use mockable::Clock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Parameters of the standard monitor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardMonitorConfig {
    /// Bound applied to every asynchronous standard monitor.
    pub timeout: Duration,
    /// Free-space threshold of the disk monitors.
    pub disk_threshold_bytes: u64,
}

impl Default for StandardMonitorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ASYNC_TIMEOUT,
            disk_threshold_bytes: DEFAULT_DISK_SPACE_THRESHOLD,
        }
    }
}

/// Ordered set of monitors with unique names.
#[derive(Clone, Default)]
pub struct MonitorCatalog {
    monitors: Vec<Arc<dyn Monitor>>,
}

impl MonitorCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the standard node monitors on top of `probe`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError`] when a descriptor is invalid, e.g. for a
    /// zero timeout.
    pub fn standard<C>(
        probe: &Arc<dyn AgentProbe>,
        clock: Arc<C>,
        config: StandardMonitorConfig,
    ) -> Result<Self, MonitorDomainError>
    where
        C: Clock + Send + Sync + 'static,
    {
        Self::new()
            .with_monitor(Arc::new(ArchitectureMonitor::new(
                Arc::clone(probe),
                config.timeout,
            )?))?
            .with_monitor(Arc::new(ClockMonitor::new(
                Arc::clone(probe),
                clock,
                config.timeout,
            )?))?
            .with_monitor(Arc::new(DiskSpaceMonitor::root(
                Arc::clone(probe),
                config.disk_threshold_bytes,
                config.timeout,
            )?))?
            .with_monitor(Arc::new(DiskSpaceMonitor::temporary(
                Arc::clone(probe),
                config.disk_threshold_bytes,
                config.timeout,
            )?))?
            .with_monitor(Arc::new(ResponseTimeMonitor::new(
                Arc::clone(probe),
                config.timeout,
            )?))
    }

    /// Adds a monitor.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError::DuplicateMonitor`] when a monitor with the
    /// same name is already registered.
    pub fn register(&mut self, monitor: Arc<dyn Monitor>) -> Result<(), MonitorDomainError> {
        let name = monitor.descriptor().name();
        if self.get(name).is_some() {
            return Err(MonitorDomainError::DuplicateMonitor(name.to_string()));
        }
        self.monitors.push(monitor);
        Ok(())
    }

    /// Adds a monitor, builder style.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError::DuplicateMonitor`] when a monitor with the
    /// same name is already registered.
    pub fn with_monitor(mut self, monitor: Arc<dyn Monitor>) -> Result<Self, MonitorDomainError> {
        self.register(monitor)?;
        Ok(self)
    }

    /// Returns the monitor registered under `name`.
    #[must_use]
    pub fn get(&self, name: &MonitorName) -> Option<&Arc<dyn Monitor>> {
        self.monitors
            .iter()
            .find(|monitor| monitor.descriptor().name() == name)
    }

    /// Returns monitors in registration order.
    #[must_use]
    pub fn monitors(&self) -> &[Arc<dyn Monitor>] {
        &self.monitors
    }

    /// Returns monitor names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&MonitorName> {
        self.monitors
            .iter()
            .map(|monitor| monitor.descriptor().name())
            .collect()
    }

    /// Returns the number of monitors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    /// Returns whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl fmt::Debug for MonitorCatalog {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries(self.names().iter().map(|name| name.as_str()))
            .finish()
    }
}

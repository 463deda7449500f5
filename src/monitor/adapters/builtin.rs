//! Standard node monitors backed by an [`AgentProbe`].

use crate::connection::{domain::AgentConnection, protocol::DiskLocation};
use crate::monitor::{
    domain::{MonitorDescriptor, MonitorDomainError, MonitorValue},
    ports::{AgentProbe, Monitor, MonitorCheckResult},
};
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Name of the architecture monitor.
pub const ARCHITECTURE_MONITOR: &str = "architecture";
/// Name of the clock difference monitor.
pub const CLOCK_DIFFERENCE_MONITOR: &str = "clock_difference";
/// Name of the root disk space monitor.
pub const DISK_SPACE_MONITOR: &str = "disk_space";
/// Name of the temporary disk space monitor.
pub const TEMPORARY_SPACE_MONITOR: &str = "temporary_space";
/// Name of the response time monitor.
pub const RESPONSE_TIME_MONITOR: &str = "response_time";

/// Free-space level below which disk monitors flag an agent.
pub const DEFAULT_DISK_SPACE_THRESHOLD: u64 = 1024 * 1024 * 1024;

/// Reports the agent's operating system and CPU architecture.
pub struct ArchitectureMonitor {
    descriptor: MonitorDescriptor,
    probe: Arc<dyn AgentProbe>,
}

impl ArchitectureMonitor {
    /// Creates the monitor bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError`] when the descriptor is invalid.
    pub fn new(probe: Arc<dyn AgentProbe>, timeout: Duration) -> Result<Self, MonitorDomainError> {
        Ok(Self {
            descriptor: MonitorDescriptor::asynchronous(
                ARCHITECTURE_MONITOR,
                "Architecture",
                timeout,
            )?,
            probe,
        })
    }
}

#[async_trait]
impl Monitor for ArchitectureMonitor {
    fn descriptor(&self) -> &MonitorDescriptor {
        &self.descriptor
    }

    async fn check(&self, agent: &AgentConnection) -> MonitorCheckResult<MonitorValue> {
        let description = self.probe.architecture(agent).await?;
        Ok(MonitorValue::Architecture { description })
    }
}

/// Measures the agent clock against the controller clock.
pub struct ClockMonitor<C: Clock + Send + Sync> {
    descriptor: MonitorDescriptor,
    probe: Arc<dyn AgentProbe>,
    clock: Arc<C>,
}

impl<C: Clock + Send + Sync> ClockMonitor<C> {
    /// Creates the monitor bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError`] when the descriptor is invalid.
    pub fn new(
        probe: Arc<dyn AgentProbe>,
        clock: Arc<C>,
        timeout: Duration,
    ) -> Result<Self, MonitorDomainError> {
        Ok(Self {
            descriptor: MonitorDescriptor::asynchronous(
                CLOCK_DIFFERENCE_MONITOR,
                "Clock Difference",
                timeout,
            )?,
            probe,
            clock,
        })
    }
}

#[async_trait]
impl<C: Clock + Send + Sync> Monitor for ClockMonitor<C> {
    fn descriptor(&self) -> &MonitorDescriptor {
        &self.descriptor
    }

    async fn check(&self, agent: &AgentConnection) -> MonitorCheckResult<MonitorValue> {
        let agent_time = self.probe.clock(agent).await?;
        let millis = (agent_time - self.clock.utc()).num_milliseconds();
        Ok(MonitorValue::ClockDifference { millis })
    }
}

/// Reports free space at one disk location.
pub struct DiskSpaceMonitor {
    descriptor: MonitorDescriptor,
    probe: Arc<dyn AgentProbe>,
    location: DiskLocation,
    threshold_bytes: u64,
}

impl DiskSpaceMonitor {
    /// Creates a monitor for the agent's root directory.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError`] when the descriptor is invalid.
    pub fn root(
        probe: Arc<dyn AgentProbe>,
        threshold_bytes: u64,
        timeout: Duration,
    ) -> Result<Self, MonitorDomainError> {
        Self::new(probe, DiskLocation::Root, threshold_bytes, timeout)
    }

    /// Creates a monitor for the agent's temporary directory.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError`] when the descriptor is invalid.
    pub fn temporary(
        probe: Arc<dyn AgentProbe>,
        threshold_bytes: u64,
        timeout: Duration,
    ) -> Result<Self, MonitorDomainError> {
        Self::new(probe, DiskLocation::Temp, threshold_bytes, timeout)
    }

    fn new(
        probe: Arc<dyn AgentProbe>,
        location: DiskLocation,
        threshold_bytes: u64,
        timeout: Duration,
    ) -> Result<Self, MonitorDomainError> {
        let descriptor = match location {
            DiskLocation::Root => {
                MonitorDescriptor::asynchronous(DISK_SPACE_MONITOR, "Free Disk Space", timeout)?
            }
            DiskLocation::Temp => MonitorDescriptor::asynchronous(
                TEMPORARY_SPACE_MONITOR,
                "Free Temp Space",
                timeout,
            )?,
        };
        Ok(Self {
            descriptor,
            probe,
            location,
            threshold_bytes,
        })
    }
}

#[async_trait]
impl Monitor for DiskSpaceMonitor {
    fn descriptor(&self) -> &MonitorDescriptor {
        &self.descriptor
    }

    async fn check(&self, agent: &AgentConnection) -> MonitorCheckResult<MonitorValue> {
        let free_bytes = self.probe.free_space(agent, self.location).await?;
        Ok(MonitorValue::disk_space(
            self.location,
            free_bytes,
            self.threshold_bytes,
        ))
    }
}

/// Measures the round trip of a ping request.
pub struct ResponseTimeMonitor {
    descriptor: MonitorDescriptor,
    probe: Arc<dyn AgentProbe>,
}

impl ResponseTimeMonitor {
    /// Creates the monitor bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorDomainError`] when the descriptor is invalid.
    pub fn new(probe: Arc<dyn AgentProbe>, timeout: Duration) -> Result<Self, MonitorDomainError> {
        Ok(Self {
            descriptor: MonitorDescriptor::asynchronous(
                RESPONSE_TIME_MONITOR,
                "Response Time",
                timeout,
            )?,
            probe,
        })
    }
}

#[async_trait]
impl Monitor for ResponseTimeMonitor {
    fn descriptor(&self) -> &MonitorDescriptor {
        &self.descriptor
    }

    async fn check(&self, agent: &AgentConnection) -> MonitorCheckResult<MonitorValue> {
        let started = Instant::now();
        self.probe.ping(agent).await?;
        let millis = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(MonitorValue::ResponseTime { millis })
    }
}

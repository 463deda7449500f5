//! Tests for the standard monitors against a mocked probe.

use std::sync::Arc;
use std::time::Duration;

use crate::connection::{
    adapters::memory::InMemoryAgentRegistry,
    domain::{AgentConnection, AgentName},
    ports::AgentRegistry,
    protocol::DiskLocation,
};
use crate::monitor::{
    adapters::{
        ARCHITECTURE_MONITOR, ArchitectureMonitor, CLOCK_DIFFERENCE_MONITOR, ClockMonitor,
        DISK_SPACE_MONITOR, DiskSpaceMonitor, RESPONSE_TIME_MONITOR, ResponseTimeMonitor,
        TEMPORARY_SPACE_MONITOR,
    },
    domain::{MonitorName, MonitorResult, MonitorValue},
    ports::{AgentProbe, Monitor, MonitorCheckError, ProbeError, ProbeResult},
    services::{MonitorCatalog, MonitorDispatcher, StandardMonitorConfig},
};
use crate::test_support::online_connection;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::DefaultClock;
use mockall::mock;

mock! {
    Probe {}

    #[async_trait]
    impl AgentProbe for Probe {
        async fn ping(&self, agent: &AgentConnection) -> ProbeResult<()>;
        async fn architecture(&self, agent: &AgentConnection) -> ProbeResult<String>;
        async fn clock(&self, agent: &AgentConnection) -> ProbeResult<DateTime<Utc>>;
        async fn free_space(
            &self,
            agent: &AgentConnection,
            location: DiskLocation,
        ) -> ProbeResult<u64>;
    }
}

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test(flavor = "multi_thread")]
async fn architecture_reports_probe_description() {
    let mut probe = MockProbe::new();
    probe
        .expect_architecture()
        .times(1)
        .returning(|_| Ok("linux (aarch64)".to_owned()));
    let monitor = ArchitectureMonitor::new(Arc::new(probe), TIMEOUT).expect("valid monitor");

    let value = monitor
        .check(&online_connection("alpha", 0))
        .await
        .expect("check succeeds");

    assert_eq!(
        value,
        MonitorValue::Architecture {
            description: "linux (aarch64)".to_owned()
        }
    );
    assert_eq!(monitor.descriptor().mode().timeout(), Some(TIMEOUT));
}

#[tokio::test(flavor = "multi_thread")]
async fn clock_difference_is_agent_minus_controller() {
    let mut probe = MockProbe::new();
    probe
        .expect_clock()
        .returning(|_| Ok(Utc::now() + TimeDelta::seconds(5)));
    let monitor = ClockMonitor::new(Arc::new(probe), Arc::new(DefaultClock), TIMEOUT)
        .expect("valid monitor");

    let value = monitor
        .check(&online_connection("alpha", 0))
        .await
        .expect("check succeeds");

    assert!(matches!(
        value,
        MonitorValue::ClockDifference { millis } if (4_000..=5_000).contains(&millis)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn temporary_space_queries_temp_location() {
    let mut probe = MockProbe::new();
    probe
        .expect_free_space()
        .withf(|_, location| *location == DiskLocation::Temp)
        .returning(|_, _| Ok(100));
    let monitor =
        DiskSpaceMonitor::temporary(Arc::new(probe), 1_000, TIMEOUT).expect("valid monitor");

    let value = monitor
        .check(&online_connection("alpha", 0))
        .await
        .expect("check succeeds");

    assert_eq!(
        value,
        MonitorValue::disk_space(DiskLocation::Temp, 100, 1_000)
    );
    assert_eq!(monitor.descriptor().name().as_str(), TEMPORARY_SPACE_MONITOR);
}

#[tokio::test(flavor = "multi_thread")]
async fn unsupported_probe_maps_to_no_implementation() {
    let mut probe = MockProbe::new();
    probe.expect_ping().returning(|_| {
        Err(ProbeError::Unsupported {
            command: "PING".to_owned(),
        })
    });
    let monitor = ResponseTimeMonitor::new(Arc::new(probe), TIMEOUT)
        .expect("valid monitor");

    let result = monitor.check(&online_connection("alpha", 0)).await;

    assert!(matches!(result, Err(MonitorCheckError::NoImplementation(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn standard_catalog_runs_all_builtin_monitors() {
    let mut probe = MockProbe::new();
    probe.expect_ping().returning(|_| Ok(()));
    probe
        .expect_architecture()
        .returning(|_| Ok("windows (x86_64)".to_owned()));
    probe.expect_clock().returning(|_| Ok(Utc::now()));
    probe.expect_free_space().returning(|_, location| match location {
        DiskLocation::Root => Ok(50 * 1024 * 1024 * 1024),
        DiskLocation::Temp => Err(ProbeError::Unsupported {
            command: "DISK temp".to_owned(),
        }),
    });
    let probe: Arc<dyn AgentProbe> = Arc::new(probe);
    let catalog = MonitorCatalog::standard(
        &probe,
        Arc::new(DefaultClock),
        StandardMonitorConfig::default(),
    )
    .expect("standard catalog");
    let registry = InMemoryAgentRegistry::new();
    registry
        .register(online_connection("win-1", 0))
        .await
        .expect("registration");

    let report = MonitorDispatcher::new(catalog)
        .run_all(&registry)
        .await
        .expect("dispatch runs");

    let agent = AgentName::new("win-1").expect("valid agent name");
    let result_of = |name: &str| {
        report
            .get(&MonitorName::new(name).expect("valid monitor name"), &agent)
            .cloned()
    };
    assert_eq!(report.len(), 5);
    for name in [
        ARCHITECTURE_MONITOR,
        CLOCK_DIFFERENCE_MONITOR,
        DISK_SPACE_MONITOR,
        RESPONSE_TIME_MONITOR,
    ] {
        assert!(
            result_of(name).is_some_and(|result| result.is_success()),
            "{name} should succeed"
        );
    }
    assert!(matches!(
        result_of(TEMPORARY_SPACE_MONITOR),
        Some(MonitorResult::IgnoredNoImplementation(_))
    ));
}

//! Tests for launching, negotiating, and registering agents.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::connection::{
    adapters::{SimulatedAgentLauncher, memory::InMemoryAgentRegistry},
    channel::AgentChannel,
    domain::{
        AgentName, AgentVersion, ConnectionState, LaunchConfig, OsFamily, VersionRequirement,
    },
    ports::{AgentLauncher, AgentRegistry, AgentRegistryError, LaunchError, LaunchRequest, LaunchResult},
    protocol::AgentManifest,
    services::{
        AgentConnectionService, ConnectionServiceError, HandshakeError, HandshakeNegotiator,
    },
};
use async_trait::async_trait;
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use tokio::io::{DuplexStream, duplex, split};

type TestService =
    AgentConnectionService<SimulatedAgentLauncher, InMemoryAgentRegistry, DefaultClock>;

struct Harness {
    launcher: Arc<SimulatedAgentLauncher>,
    service: TestService,
}

impl Harness {
    fn define(&self, agent: &str, manifest: AgentManifest) {
        self.launcher
            .define_agent(AgentName::new(agent).expect("valid agent name"), manifest)
            .expect("manifest stored");
    }
}

#[fixture]
fn harness() -> Harness {
    let launcher = Arc::new(SimulatedAgentLauncher::new());
    let negotiator = HandshakeNegotiator::new(VersionRequirement::default())
        .with_timeout(Duration::from_secs(5))
        .with_capability_timeout(Duration::from_millis(200));
    let service = AgentConnectionService::new(
        Arc::clone(&launcher),
        Arc::new(InMemoryAgentRegistry::new()),
        negotiator,
        Arc::new(DefaultClock),
    );
    Harness { launcher, service }
}

fn agent_name(raw: &str) -> AgentName {
    AgentName::new(raw).expect("valid agent name")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn supported_agent_goes_online_and_is_registered(harness: Harness) {
    harness.define(
        "linux-1",
        AgentManifest {
            os_family: OsFamily::Unix,
            ..AgentManifest::new("3.14.0")
        },
    );

    let connection = harness
        .service
        .connect("linux-1")
        .await
        .expect("agent should connect");

    assert_eq!(connection.state(), ConnectionState::Online);
    assert_eq!(connection.version(), Some(AgentVersion::new(3, 14, 0)));
    assert_eq!(connection.os_family(), OsFamily::Unix);
    let registered = harness
        .service
        .registry()
        .get(&agent_name("linux-1"))
        .await
        .expect("agent registered");
    assert_eq!(registered.id(), connection.id());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn old_agent_is_rejected_with_both_versions(harness: Harness) {
    harness.define("legacy", AgentManifest::new("3.10.0"));

    let err = harness
        .service
        .connect("legacy")
        .await
        .expect_err("old agent must be rejected");

    let message = err.to_string();
    assert!(message.contains("3.10.0"), "{message}");
    assert!(message.contains("3.14.0"), "{message}");
    assert!(matches!(
        err,
        ConnectionServiceError::Handshake(HandshakeError::Unsupported { .. })
    ));
    assert!(matches!(
        harness.service.registry().get(&agent_name("legacy")).await,
        Err(AgentRegistryError::NotFound(_))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_version_is_rejected(harness: Harness) {
    harness.define("odd", AgentManifest::new("nightly"));

    let result = harness.service.connect("odd").await;

    assert!(matches!(
        result,
        Err(ConnectionServiceError::Handshake(HandshakeError::Malformed { ref reported }))
            if reported == "nightly"
    ));
    assert!(harness.service.registry().list().await.expect("list").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_capability_frame_leaves_os_family_unknown(harness: Harness) {
    harness.define(
        "quiet",
        AgentManifest {
            sends_capabilities: false,
            ..AgentManifest::new("4.0.0")
        },
    );

    let connection = harness.service.connect("quiet").await.expect("agent connects");

    assert_eq!(connection.os_family(), OsFamily::Unknown);
    assert!(connection.is_online());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_agent_fails_to_launch(harness: Harness) {
    let result = harness.service.connect("ghost").await;

    assert!(matches!(
        result,
        Err(ConnectionServiceError::Launch(LaunchError::UnknownAgent(_)))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_agent_name_is_a_domain_error(harness: Harness) {
    let result = harness.service.connect("not valid").await;

    assert!(matches!(result, Err(ConnectionServiceError::Domain(_))));
    assert!(harness.launcher.launches().is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reconnecting_replaces_and_closes_previous_connection(harness: Harness) {
    harness.define("builder", AgentManifest::default());

    let first = harness.service.connect("builder").await.expect("first connect");
    let second = harness.service.connect("builder").await.expect("second connect");

    let listed = harness.service.registry().list().await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed.first().map(|entry| entry.id()), Some(second.id()));
    assert!(first.channel().is_closed());
    assert!(!second.channel().is_closed());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn launches_receive_increasing_sequences_and_debug_ports(harness: Harness) {
    harness
        .launcher
        .record_commands_with(
            LaunchConfig::new("java", "agent.jar")
                .expect("valid launch config")
                .with_debug_port_base(5005),
        )
        .expect("config stored");
    harness.define("a", AgentManifest::default());
    harness.define("b", AgentManifest::default());

    harness.service.connect("a").await.expect("a connects");
    harness.service.connect("b").await.expect("b connects");

    let launches = harness.launcher.launches();
    let sequences: Vec<u32> = launches.iter().map(|record| record.sequence.value()).collect();
    let ports: Vec<Option<u16>> = launches
        .iter()
        .map(|record| record.command.as_ref().and_then(|command| command.debug_port()))
        .collect();
    assert_eq!(sequences, vec![0, 1]);
    assert_eq!(ports, vec![Some(5005), Some(5006)]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fleet_connects_each_agent_independently(harness: Harness) {
    harness.define("new-1", AgentManifest::new("3.14.2"));
    harness.define("old-1", AgentManifest::new("3.9.0"));
    harness.define("new-2", AgentManifest::new("5.0.0"));

    let results = harness
        .service
        .connect_fleet(&["new-1", "old-1", "new-2"])
        .await;

    let accepted: Vec<bool> = results.iter().map(Result::is_ok).collect();
    assert_eq!(accepted, vec![true, false, true]);
    let names: Vec<String> = harness
        .service
        .registry()
        .list()
        .await
        .expect("list")
        .iter()
        .map(|connection| connection.name().to_string())
        .collect();
    assert_eq!(names, vec!["new-1", "new-2"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn disconnect_unregisters_and_closes_channel(harness: Harness) {
    harness.define("builder", AgentManifest::default());
    harness.service.connect("builder").await.expect("agent connects");

    let released = harness
        .service
        .disconnect("builder")
        .await
        .expect("agent disconnects");

    assert_eq!(released.state(), ConnectionState::Disconnected);
    assert!(released.channel().is_closed());
    assert!(matches!(
        harness.service.disconnect("builder").await,
        Err(ConnectionServiceError::Registry(AgentRegistryError::NotFound(_)))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn shutdown_clears_every_connection(harness: Harness) {
    harness.define("a", AgentManifest::default());
    harness.define("b", AgentManifest::default());
    harness.service.connect_fleet(&["a", "b"]).await;

    let released = harness.service.shutdown().await.expect("shutdown succeeds");

    assert_eq!(released.len(), 2);
    assert!(released
        .iter()
        .all(|connection| connection.state() == ConnectionState::Disconnected));
    assert!(harness.service.registry().list().await.expect("list").is_empty());
}

/// Launcher whose agents never speak; the agent ends are kept or dropped.
#[derive(Default)]
struct SilentLauncher {
    keep_open: bool,
    agent_ends: Mutex<Vec<DuplexStream>>,
}

#[async_trait]
impl AgentLauncher for SilentLauncher {
    async fn launch(&self, _request: &LaunchRequest) -> LaunchResult<AgentChannel> {
        let (controller_side, agent_side) = duplex(256);
        if self.keep_open {
            self.agent_ends
                .lock()
                .map_err(|err| LaunchError::runtime(std::io::Error::other(err.to_string())))?
                .push(agent_side);
        }
        let (reader, writer) = split(controller_side);
        Ok(AgentChannel::new(reader, writer))
    }
}

fn silent_service(
    keep_open: bool,
) -> AgentConnectionService<SilentLauncher, InMemoryAgentRegistry, DefaultClock> {
    AgentConnectionService::new(
        Arc::new(SilentLauncher {
            keep_open,
            ..SilentLauncher::default()
        }),
        Arc::new(InMemoryAgentRegistry::new()),
        HandshakeNegotiator::default().with_timeout(Duration::from_millis(100)),
        Arc::new(DefaultClock),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn silent_agent_times_out() {
    let result = silent_service(true).connect("mute").await;

    assert!(matches!(
        result,
        Err(ConnectionServiceError::Handshake(HandshakeError::Timeout(timeout)))
            if timeout == Duration::from_millis(100)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn agent_hanging_up_before_version_is_reported() {
    let result = silent_service(false).connect("gone").await;

    assert!(matches!(
        result,
        Err(ConnectionServiceError::Handshake(HandshakeError::ChannelClosed))
    ));
}

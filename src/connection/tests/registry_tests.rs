//! Tests for the in-memory agent registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::connection::{
    adapters::memory::InMemoryAgentRegistry,
    domain::{AgentName, ConnectionState},
    ports::{AgentRegistry, AgentRegistryError, RegistrationOutcome},
};
use crate::test_support::{connection_in_state, online_connection};
use rstest::{fixture, rstest};

#[fixture]
fn registry() -> InMemoryAgentRegistry {
    InMemoryAgentRegistry::new()
}

fn name(raw: &str) -> AgentName {
    AgentName::new(raw).expect("valid agent name")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn register_then_get_returns_connection(registry: InMemoryAgentRegistry) {
    let connection = online_connection("alpha", 0);
    let outcome = registry
        .register(connection.clone())
        .await
        .expect("registration should succeed");

    assert!(matches!(outcome, RegistrationOutcome::Registered));
    let fetched = registry.get(&name("alpha")).await.expect("agent present");
    assert_eq!(fetched.id(), connection.id());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn register_rejects_connections_that_are_not_online(registry: InMemoryAgentRegistry) {
    let (connection, _agent) = connection_in_state("alpha", 0, false);

    let result = registry.register(connection).await;

    assert!(matches!(
        result,
        Err(AgentRegistryError::NotOnline { state: ConnectionState::Connecting, .. })
    ));
    assert!(registry.list().await.expect("list succeeds").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reregistering_a_name_replaces_the_entry(registry: InMemoryAgentRegistry) {
    let first = online_connection("alpha", 0);
    let second = online_connection("alpha", 1);
    registry.register(first.clone()).await.expect("first registration");

    let outcome = registry
        .register(second.clone())
        .await
        .expect("second registration");

    match outcome {
        RegistrationOutcome::Reconnected(previous) => assert_eq!(previous.id(), first.id()),
        RegistrationOutcome::Registered => panic!("expected a reconnection"),
    }
    let listed = registry.list().await.expect("list succeeds");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed.first().map(|entry| entry.id()), Some(second.id()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unregister_removes_and_returns_connection(registry: InMemoryAgentRegistry) {
    let connection = online_connection("alpha", 0);
    registry.register(connection.clone()).await.expect("registration");

    let removed = registry.unregister(&name("alpha")).await.expect("agent removed");

    assert_eq!(removed.id(), connection.id());
    assert!(matches!(
        registry.get(&name("alpha")).await,
        Err(AgentRegistryError::NotFound(_))
    ));
    assert!(matches!(
        registry.unregister(&name("alpha")).await,
        Err(AgentRegistryError::NotFound(_))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_orders_agents_by_name(registry: InMemoryAgentRegistry) {
    for (sequence, agent) in ["gamma", "alpha", "beta"].into_iter().enumerate() {
        let sequence = u32::try_from(sequence).expect("small sequence");
        registry
            .register(online_connection(agent, sequence))
            .await
            .expect("registration");
    }

    let names: Vec<String> = registry
        .list()
        .await
        .expect("list succeeds")
        .iter()
        .map(|connection| connection.name().to_string())
        .collect();

    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn clear_empties_the_registry(registry: InMemoryAgentRegistry) {
    registry.register(online_connection("alpha", 0)).await.expect("registration");
    registry.register(online_connection("beta", 1)).await.expect("registration");

    let cleared = registry.clear().await.expect("clear succeeds");

    assert_eq!(cleared.len(), 2);
    assert!(registry.list().await.expect("list succeeds").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_registrations_are_all_visible(registry: InMemoryAgentRegistry) {
    let registry = Arc::new(registry);
    let mut handles = Vec::new();
    for sequence in 0..16_u32 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry
                .register(online_connection(&format!("agent-{sequence:02}"), sequence))
                .await
        }));
    }
    for handle in handles {
        handle
            .await
            .expect("task completes")
            .expect("registration succeeds");
    }

    assert_eq!(registry.list().await.expect("list succeeds").len(), 16);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lookups_never_miss_an_agent_while_it_reconnects(registry: InMemoryAgentRegistry) {
    let registry = Arc::new(registry);
    registry
        .register(online_connection("alpha", 0))
        .await
        .expect("initial registration");
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let stop = Arc::clone(&stop);
            tokio::spawn(async move {
                loop {
                    registry.get(&name("alpha")).await?;
                    assert_eq!(registry.list().await?.len(), 1);
                    if stop.load(Ordering::Acquire) {
                        return Ok::<_, AgentRegistryError>(());
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for sequence in 1..=200_u32 {
        let outcome = registry
            .register(online_connection("alpha", sequence))
            .await
            .expect("re-registration");
        assert!(outcome.is_reconnection());
        tokio::task::yield_now().await;
    }
    stop.store(true, Ordering::Release);

    for reader in readers {
        reader
            .await
            .expect("reader completes")
            .expect("agent stays visible throughout");
    }
    let current = registry.get(&name("alpha")).await.expect("agent present");
    assert_eq!(current.sequence().value(), 200);
}

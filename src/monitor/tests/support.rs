//! Configurable monitors for dispatcher tests.

use std::sync::Arc;
use std::time::Duration;

use crate::connection::domain::AgentConnection;
use crate::monitor::{
    domain::{MonitorDescriptor, MonitorValue},
    ports::{Monitor, MonitorCheckError, MonitorCheckResult},
};
use async_trait::async_trait;

/// What a [`ScriptedMonitor`] does when checked.
#[derive(Debug, Clone, Copy)]
pub(super) enum Behaviour {
    Value(i64),
    Fault,
    NoImplementation,
    Skip,
    Panic,
    Hang,
    Sleep(Duration),
}

pub(super) struct ScriptedMonitor {
    descriptor: MonitorDescriptor,
    behaviour: Behaviour,
}

impl ScriptedMonitor {
    pub(super) fn sync(name: &str, behaviour: Behaviour) -> Arc<dyn Monitor> {
        Arc::new(Self {
            descriptor: MonitorDescriptor::synchronous(name, name).expect("valid descriptor"),
            behaviour,
        })
    }

    pub(super) fn bounded(name: &str, bound: Duration, behaviour: Behaviour) -> Arc<dyn Monitor> {
        Arc::new(Self {
            descriptor: MonitorDescriptor::asynchronous(name, name, bound)
                .expect("valid descriptor"),
            behaviour,
        })
    }
}

#[async_trait]
impl Monitor for ScriptedMonitor {
    fn descriptor(&self) -> &MonitorDescriptor {
        &self.descriptor
    }

    async fn check(&self, agent: &AgentConnection) -> MonitorCheckResult<MonitorValue> {
        match self.behaviour {
            Behaviour::Value(value) => Ok(MonitorValue::Custom {
                value: serde_json::json!({ "agent": agent.name().as_str(), "value": value }),
            }),
            Behaviour::Fault => Err(MonitorCheckError::fault(std::io::Error::other(
                "probe exploded",
            ))),
            Behaviour::NoImplementation => Err(MonitorCheckError::NoImplementation(
                "not available on this platform".to_owned(),
            )),
            Behaviour::Skip => Err(MonitorCheckError::Skipped("not applicable".to_owned())),
            Behaviour::Panic => panic!("boom"),
            Behaviour::Hang => std::future::pending().await,
            Behaviour::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(MonitorValue::ResponseTime { millis: 0 })
            }
        }
    }
}

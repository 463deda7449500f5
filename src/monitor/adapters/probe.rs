//! Probe adapter speaking the request/response protocol over agent channels.

use crate::connection::{
    domain::AgentConnection,
    protocol::{DiskLocation, ERR, OK, ProbeCommand, UNSUPPORTED},
};
use crate::monitor::ports::{AgentProbe, ProbeError, ProbeResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

// Shared by all probes so ids stay unique per channel.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// [`AgentProbe`] that sends probe requests over the agent's channel.
///
/// Requests on one agent are in flight together; the channel hands each
/// response to the request with the matching id. Responses to abandoned
/// requests are discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelProbe;

impl ChannelProbe {
    /// Creates a channel probe.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn request(&self, agent: &AgentConnection, command: ProbeCommand) -> ProbeResult<String> {
        let request_id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        debug!(agent = %agent.name(), request_id, %command, "probe request");
        let body = agent
            .channel()
            .request(request_id, &command.to_frame(request_id))
            .await?
            .ok_or(ProbeError::ChannelClosed)?;
        parse_response(command, &body)
    }
}

fn parse_response(command: ProbeCommand, body: &str) -> ProbeResult<String> {
    let (status, payload) = body.split_once(' ').unwrap_or((body, ""));
    match status {
        OK => Ok(payload.to_owned()),
        ERR => Err(ProbeError::Remote(payload.to_owned())),
        UNSUPPORTED => Err(ProbeError::Unsupported {
            command: command.to_string(),
        }),
        _ => Err(ProbeError::Protocol(format!(
            "unexpected response '{body}' to {command}"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(command: ProbeCommand, payload: &str) -> ProbeResult<T> {
    payload.trim().parse::<T>().map_err(|_| {
        ProbeError::Protocol(format!("{command} returned non-numeric payload '{payload}'"))
    })
}

#[async_trait]
impl AgentProbe for ChannelProbe {
    async fn ping(&self, agent: &AgentConnection) -> ProbeResult<()> {
        self.request(agent, ProbeCommand::Ping).await.map(|_| ())
    }

    async fn architecture(&self, agent: &AgentConnection) -> ProbeResult<String> {
        self.request(agent, ProbeCommand::Arch).await
    }

    async fn clock(&self, agent: &AgentConnection) -> ProbeResult<DateTime<Utc>> {
        let payload = self.request(agent, ProbeCommand::Clock).await?;
        let millis = parse_number::<i64>(ProbeCommand::Clock, &payload)?;
        DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            ProbeError::Protocol(format!("CLOCK returned out-of-range timestamp {millis}"))
        })
    }

    async fn free_space(
        &self,
        agent: &AgentConnection,
        location: DiskLocation,
    ) -> ProbeResult<u64> {
        let command = ProbeCommand::Disk(location);
        let payload = self.request(agent, command).await?;
        parse_number(command, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("OK 42", "42")]
    #[case("OK", "")]
    #[case("OK linux (x86_64)", "linux (x86_64)")]
    fn ok_responses_yield_payload(#[case] body: &str, #[case] expected: &str) {
        let parsed = parse_response(ProbeCommand::Ping, body).expect("ok response");
        assert_eq!(parsed, expected);
    }

    #[test]
    fn unsupported_names_the_command() {
        let err = parse_response(ProbeCommand::Disk(DiskLocation::Temp), "UNSUPPORTED")
            .expect_err("unsupported response");
        assert!(matches!(err, ProbeError::Unsupported { ref command } if command == "DISK temp"));
    }

    #[test]
    fn err_responses_carry_message() {
        let err = parse_response(ProbeCommand::Clock, "ERR clock unavailable")
            .expect_err("error response");
        assert!(matches!(err, ProbeError::Remote(ref message) if message == "clock unavailable"));
    }

    #[test]
    fn unknown_status_is_a_protocol_error() {
        let err = parse_response(ProbeCommand::Arch, "MAYBE").expect_err("bad status");
        assert!(matches!(err, ProbeError::Protocol(_)));
    }
}

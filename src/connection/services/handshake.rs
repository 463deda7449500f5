//! Version handshake performed on every freshly launched agent.

use crate::connection::{
    channel::AgentChannel,
    domain::{AgentVersion, NegotiatedAgent, OsFamily, VersionRequirement},
    protocol::{ACCEPT, REJECT},
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Time allowed for the agent's version frame.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for the optional capability frame after `ACCEPT`.
pub const DEFAULT_CAPABILITY_TIMEOUT: Duration = Duration::from_secs(1);

/// Reasons a handshake ends without an online agent.
#[derive(Debug, Clone, Error)]
pub enum HandshakeError {
    /// The agent version is older than the minimal supported version.
    #[error("agent version {reported} is not supported; minimal supported version is {required}")]
    Unsupported {
        /// Version text as reported by the agent.
        reported: String,
        /// Minimal supported version.
        required: AgentVersion,
    },

    /// The agent's version frame is not a `major.minor.patch` triple.
    #[error("agent reported malformed version '{reported}'")]
    Malformed {
        /// Frame text as reported by the agent.
        reported: String,
    },

    /// The channel ended before the agent sent its version.
    #[error("agent closed the channel before sending its version")]
    ChannelClosed,

    /// The agent did not send its version in time.
    #[error("agent did not send its version within {0:?}")]
    Timeout(Duration),

    /// Transport failure during the handshake.
    #[error("handshake transport error: {0}")]
    Io(Arc<io::Error>),
}

impl From<io::Error> for HandshakeError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

/// Gatekeeper comparing agent versions with the minimal supported version.
#[derive(Debug, Clone)]
pub struct HandshakeNegotiator {
    requirement: VersionRequirement,
    version_timeout: Duration,
    capability_timeout: Duration,
}

impl HandshakeNegotiator {
    /// Creates a negotiator enforcing `requirement`.
    #[must_use]
    pub const fn new(requirement: VersionRequirement) -> Self {
        Self {
            requirement,
            version_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            capability_timeout: DEFAULT_CAPABILITY_TIMEOUT,
        }
    }

    /// Replaces the version frame timeout.
    #[must_use]
    pub const fn with_timeout(mut self, version_timeout: Duration) -> Self {
        self.version_timeout = version_timeout;
        self
    }

    /// Replaces the capability frame timeout.
    #[must_use]
    pub const fn with_capability_timeout(mut self, capability_timeout: Duration) -> Self {
        self.capability_timeout = capability_timeout;
        self
    }

    /// Returns the enforced requirement.
    #[must_use]
    pub const fn requirement(&self) -> VersionRequirement {
        self.requirement
    }

    /// Decides whether a reported version passes the gate.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::Malformed`] for unparseable text and
    /// [`HandshakeError::Unsupported`] for versions below the minimum. Both
    /// carry the reported text verbatim.
    pub fn evaluate(&self, reported: &str) -> Result<AgentVersion, HandshakeError> {
        let version = AgentVersion::parse(reported).map_err(|_| HandshakeError::Malformed {
            reported: reported.to_owned(),
        })?;

        if !self.requirement.is_satisfied_by(version) {
            return Err(HandshakeError::Unsupported {
                reported: reported.to_owned(),
                required: self.requirement.minimum(),
            });
        }
        Ok(version)
    }

    /// Runs the handshake on a freshly opened channel.
    ///
    /// On rejection a `REJECT <reason>` frame is sent on a best-effort basis;
    /// closing the channel is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError`] when the agent is rejected or the exchange
    /// fails.
    pub async fn negotiate(
        &self,
        channel: &AgentChannel,
    ) -> Result<NegotiatedAgent, HandshakeError> {
        let reported = timeout(self.version_timeout, channel.read_frame())
            .await
            .map_err(|_| HandshakeError::Timeout(self.version_timeout))??
            .ok_or(HandshakeError::ChannelClosed)?;

        let version = match self.evaluate(&reported) {
            Ok(version) => version,
            Err(err) => {
                warn!(reported = %reported, required = %self.requirement.minimum(), error = %err, "rejecting agent");
                if let Err(write_err) = channel.write_frame(&format!("{REJECT} {err}")).await {
                    debug!(error = %write_err, "could not deliver rejection to agent");
                }
                return Err(err);
            }
        };

        channel.write_frame(ACCEPT).await?;
        let os_family = self.read_capabilities(channel).await;
        info!(%version, %os_family, "agent handshake accepted");
        Ok(NegotiatedAgent::new(version, os_family))
    }

    async fn read_capabilities(&self, channel: &AgentChannel) -> OsFamily {
        match timeout(self.capability_timeout, channel.read_frame()).await {
            Ok(Ok(Some(frame))) => OsFamily::from_capability(&frame),
            Ok(Ok(None)) => OsFamily::Unknown,
            Ok(Err(err)) => {
                debug!(error = %err, "agent capability frame unreadable");
                OsFamily::Unknown
            }
            Err(_) => {
                debug!("agent sent no capability frame");
                OsFamily::Unknown
            }
        }
    }
}

impl Default for HandshakeNegotiator {
    fn default() -> Self {
        Self::new(VersionRequirement::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn negotiator(minimum: &str) -> HandshakeNegotiator {
        HandshakeNegotiator::new(VersionRequirement::new(
            AgentVersion::parse(minimum).expect("valid minimum"),
        ))
    }

    #[rstest]
    #[case("3.10.0", "3.14.0", false)]
    #[case("3.14.0", "3.14.0", true)]
    #[case("3.14.1", "3.14.0", true)]
    #[case("4.0.0", "3.14.0", true)]
    #[case("3.9.99", "3.10.0", false)]
    #[case("10.0.0", "9.99.99", true)]
    fn accepts_iff_reported_at_least_required(
        #[case] reported: &str,
        #[case] required: &str,
        #[case] accepted: bool,
    ) {
        assert_eq!(negotiator(required).evaluate(reported).is_ok(), accepted);
    }

    #[test]
    fn unsupported_reports_both_versions_verbatim() {
        let err = negotiator("3.14.0")
            .evaluate("3.10.0")
            .expect_err("old agent must be rejected");

        assert!(matches!(
            &err,
            HandshakeError::Unsupported { reported, required }
                if reported == "3.10.0" && required.to_string() == "3.14.0"
        ));
        let message = err.to_string();
        assert!(message.contains("3.10.0"));
        assert!(message.contains("3.14.0"));
    }

    #[rstest]
    #[case("latest")]
    #[case("")]
    #[case("3.14")]
    #[case("3.14.0.1")]
    #[case("3.x.0")]
    #[case("+3.14.0")]
    fn malformed_versions_are_rejected(#[case] reported: &str) {
        let result = negotiator("3.14.0").evaluate(reported);

        assert!(matches!(
            result,
            Err(HandshakeError::Malformed { reported: ref text }) if text == reported
        ));
    }
}

//! Config schema types (mailbox, Graph credentials, downstream service,
//! polling, relay delivery, idempotency tracking, runner).

use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpindriftConfig {
    pub mail: MailConfig,
    pub graph: GraphConfig,
    pub saildocs: SaildocsConfig,
    pub poll: PollConfig,
    pub relay: RelayConfig,
    pub tracker: TrackerConfig,
    pub runner: RunnerConfig,
}

/// Mailbox that receives device requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Account the relay reads and sends from.
    pub mailbox: String,
    /// Sender address of inbound device request mails.
    pub service_address: String,
    /// Max messages fetched per inbox search.
    pub search_top: usize,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            mailbox: String::new(),
            service_address: String::new(),
            search_top: 25,
        }
    }
}

/// Microsoft Graph application credentials (client-credentials flow).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    #[serde(serialize_with = "serialize_secret")]
    pub client_secret: Secret<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: Secret::new(String::new()),
        }
    }
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Downstream weather query service addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaildocsConfig {
    /// Address queries are mailed to.
    pub query_address: String,
    /// Address replies arrive from.
    pub response_address: String,
    /// Attachment name suffix identifying the weather payload.
    pub attachment_suffix: String,
}

impl Default for SaildocsConfig {
    fn default() -> Self {
        Self {
            query_address: "query@saildocs.com".into(),
            response_address: "query-reply@saildocs.com".into(),
            attachment_suffix: ".grb".into(),
        }
    }
}

/// Reply correlation polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between inbox polls while waiting for a downstream reply.
    pub interval_secs: u64,
    /// Overall deadline for a downstream reply, in seconds.
    pub timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            timeout_secs: 60,
        }
    }
}

/// Outbound frame delivery to the device reply channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Max characters per frame payload.
    pub split_length: usize,
    /// Seconds to wait between consecutive frame sends.
    pub send_delay_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            split_length: 120,
            send_delay_secs: 5,
        }
    }
}

/// Which idempotency strategy guards inbound items.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackerStrategy {
    /// Rely on the mailbox's own read/unread flag.
    #[default]
    Mailbox,
    /// Keep an explicit append-only log of handled item ids.
    Log,
}

/// Idempotency tracking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub strategy: TrackerStrategy,
    /// Handled-log path; defaults to `<config dir>/handled.jsonl` when the
    /// log strategy is selected and no path is given.
    pub log_path: Option<PathBuf>,
}

/// Self-looping runner mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Seconds between iterations when running with `--loop`.
    pub loop_interval_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            loop_interval_secs: 300,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment_values() {
        let cfg = SpindriftConfig::default();
        assert_eq!(cfg.mail.search_top, 25);
        assert_eq!(cfg.relay.split_length, 120);
        assert_eq!(cfg.relay.send_delay_secs, 5);
        assert_eq!(cfg.poll.interval_secs, 10);
        assert_eq!(cfg.poll.timeout_secs, 60);
        assert_eq!(cfg.runner.loop_interval_secs, 300);
        assert_eq!(cfg.tracker.strategy, TrackerStrategy::Mailbox);
        assert_eq!(cfg.saildocs.attachment_suffix, ".grb");
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let toml = r#"
            [mail]
            mailbox = "relay@example.com"
            service_address = "no.reply.inreach@garmin.com"

            [graph]
            tenant_id = "tid"
            client_id = "cid"
            client_secret = "shh"

            [tracker]
            strategy = "log"
        "#;
        let cfg: SpindriftConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.mail.mailbox, "relay@example.com");
        assert_eq!(cfg.graph.client_secret.expose_secret(), "shh");
        assert_eq!(cfg.tracker.strategy, TrackerStrategy::Log);
        // untouched sections keep their defaults
        assert_eq!(cfg.relay.split_length, 120);
    }

    #[test]
    fn test_debug_redacts_client_secret() {
        let cfg = GraphConfig {
            tenant_id: "t".into(),
            client_id: "c".into(),
            client_secret: Secret::new("super-secret".into()),
        };
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret"));
    }
}

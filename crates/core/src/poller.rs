//! Reply correlation against a push-less downstream service.
//!
//! The downstream service answers by mail with no request id; the only
//! correlation key is that its reply echoes the command text. The poller
//! repeatedly searches unread mail from the expected sender and tests
//! case-insensitive containment of the verbatim command until a match is
//! found or the deadline passes.
//!
//! Known limitation, kept on purpose: two concurrently in-flight commands
//! sharing a substring can cross-match. The design assumes one request in
//! flight per account at a time.

use std::time::Duration;

use {
    tokio::time::Instant,
    tracing::{debug, info},
};

use spindrift_mail::{MailGateway, MailMessage, SearchFilter};

use crate::Result;

/// Typed outcome of one correlation wait. Timing out is a value, not an
/// error, so callers cannot forget the branch.
#[derive(Debug)]
pub enum PollOutcome {
    Matched(MailMessage),
    TimedOut,
}

/// Polls the mailbox for the reply matching an issued command.
#[derive(Debug, Clone)]
pub struct CorrelationPoller {
    interval: Duration,
    timeout: Duration,
    search_top: usize,
}

impl CorrelationPoller {
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration, search_top: usize) -> Self {
        Self {
            interval,
            timeout,
            search_top,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for an unread mail from `sender` whose body contains `command`.
    ///
    /// Candidates that do not match are left untouched for future polls;
    /// only the first matching candidate is returned. Ticks are separated
    /// by the configured interval, and the deadline is checked after each
    /// search pass so the first pass always runs.
    pub async fn await_reply(
        &self,
        mail: &dyn MailGateway,
        mailbox: &str,
        sender: &str,
        command: &str,
    ) -> Result<PollOutcome> {
        let issued_at = Instant::now();
        let deadline = issued_at + self.timeout;

        let filter = SearchFilter {
            sender: Some(sender.to_string()),
            unread_only: true,
            max_results: self.search_top,
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(attempt, command, "polling for downstream reply");

            let candidates = mail.search_messages(mailbox, &filter).await?;
            for candidate in candidates {
                if matches_command(&candidate.flattened_body(), command) {
                    info!(
                        attempt,
                        message_id = %candidate.id,
                        "downstream reply matched"
                    );
                    return Ok(PollOutcome::Matched(candidate));
                }
            }

            if Instant::now() >= deadline {
                info!(attempt, command, "no downstream reply before deadline");
                return Ok(PollOutcome::TimedOut);
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Case-insensitive, whitespace-normalized containment test.
///
/// The downstream service rewrites casing and line breaks when echoing the
/// command, so both sides are flattened before comparison.
#[must_use]
pub fn matches_command(body: &str, command: &str) -> bool {
    let body = flatten(body);
    let command = flatten(command);
    !command.is_empty() && body.contains(&command)
}

fn flatten(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

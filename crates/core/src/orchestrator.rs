//! End-to-end sequencing of one relay invocation.

use std::{sync::Arc, time::Duration};

use tracing::{error, info, warn};

use {
    spindrift_codec as codec,
    spindrift_config::SpindriftConfig,
    spindrift_mail::{MailGateway, MailMessage, SearchFilter},
    spindrift_relay::{RelayDispatcher, ReplyTransport},
};

use crate::{
    Error, Result,
    chat::ChatResponder,
    parse::{self, RequestKind},
    poller::{CorrelationPoller, PollOutcome},
    tracker::IdempotencyTracker,
};

/// Coarse failure class, used for the diagnostic frame and the caller's
/// outcome. Transport failures are the only non-terminal class: the item
/// stays unmarked so the next scheduled invocation retries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    InvalidRequest,
    Timeout,
    DownloadFailed,
    ChatUnavailable,
    Transport,
    Internal,
}

impl FailureCategory {
    fn classify(error: &Error) -> Self {
        match error {
            Error::Parse(_) => Self::InvalidRequest,
            Error::CorrelationTimeout { .. } => Self::Timeout,
            Error::AttachmentMissing { .. } => Self::DownloadFailed,
            Error::ChatUnavailable | Error::Chat { .. } => Self::ChatUnavailable,
            Error::Mail(_) | Error::Io(_) => Self::Transport,
            Error::Relay(spindrift_relay::Error::Http(_)) => Self::Transport,
            _ => Self::Internal,
        }
    }

    /// Terminal failures consume the item; transport failures leave it for
    /// the next invocation.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Transport)
    }

    /// Single-line device-readable description.
    fn diagnostic_text(self) -> &'static str {
        match self {
            Self::InvalidRequest => {
                "request not understood; expected: GRIB <command> reply to garmin: <url>"
            },
            Self::Timeout => "no weather reply before the deadline; try again later",
            Self::DownloadFailed => "weather reply had no data file attached",
            Self::ChatUnavailable => "chat is not available on this relay",
            Self::Transport | Self::Internal => "relay error; request was not completed",
        }
    }
}

/// Caller-visible result of one invocation. Failures are values; nothing
/// propagates out of [`Orchestrator::run_once`].
#[derive(Debug)]
pub enum RunOutcome {
    /// No unread request was waiting.
    Idle,
    /// Frames were delivered (some may individually have failed; partial
    /// delivery is a visible, acceptable outcome on this channel).
    Completed { frames_delivered: usize },
    Failed { category: FailureCategory },
}

/// Composes parser, poller, codec, dispatcher, and tracker into the single
/// receive → query → correlate → encode → deliver → commit flow.
pub struct Orchestrator {
    mail: Arc<dyn MailGateway>,
    tracker: Arc<dyn IdempotencyTracker>,
    chat: Option<Arc<dyn ChatResponder>>,
    dispatcher: RelayDispatcher,
    poller: CorrelationPoller,
    mailbox: String,
    service_address: String,
    query_address: String,
    response_address: String,
    attachment_suffix: String,
    search_top: usize,
    split_length: usize,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        config: &SpindriftConfig,
        mail: Arc<dyn MailGateway>,
        transport: Arc<dyn ReplyTransport>,
        tracker: Arc<dyn IdempotencyTracker>,
        chat: Option<Arc<dyn ChatResponder>>,
    ) -> Self {
        let dispatcher = RelayDispatcher::new(transport, config.mail.mailbox.clone())
            .with_pacing(Duration::from_secs(config.relay.send_delay_secs));
        let poller = CorrelationPoller::new(
            Duration::from_secs(config.poll.interval_secs),
            Duration::from_secs(config.poll.timeout_secs),
            config.mail.search_top,
        );
        Self {
            mail,
            tracker,
            chat,
            dispatcher,
            poller,
            mailbox: config.mail.mailbox.clone(),
            service_address: config.mail.service_address.clone(),
            query_address: config.saildocs.query_address.clone(),
            response_address: config.saildocs.response_address.clone(),
            attachment_suffix: config.saildocs.attachment_suffix.clone(),
            search_top: config.mail.search_top,
            split_length: config.relay.split_length,
        }
    }

    /// Process at most one inbound item. Never panics or propagates an
    /// error; invocations are periodic and independent.
    pub async fn run_once(&self) -> RunOutcome {
        let item = match self.fetch_next_item().await {
            Ok(Some(item)) => item,
            Ok(None) => {
                info!("no new device requests");
                return RunOutcome::Idle;
            },
            Err(e) => {
                error!(error = %e, "inbox fetch failed");
                return RunOutcome::Failed {
                    category: FailureCategory::Transport,
                };
            },
        };

        info!(item_id = %item.id, "processing device request");
        let raw_body = item.flattened_body();

        match self.process_item(&raw_body).await {
            Ok(frames_delivered) => {
                self.commit(&item.id).await;
                info!(item_id = %item.id, frames_delivered, "request completed");
                RunOutcome::Completed { frames_delivered }
            },
            Err(e) => {
                let category = FailureCategory::classify(&e);
                error!(item_id = %item.id, error = %e, ?category, "request failed");

                if category.is_terminal() {
                    if let Some(destination) = parse::recover_destination(&raw_body) {
                        self.send_diagnostic(&destination, category).await;
                    }
                    self.commit(&item.id).await;
                }
                RunOutcome::Failed { category }
            },
        }
    }

    async fn fetch_next_item(&self) -> Result<Option<MailMessage>> {
        let filter = SearchFilter {
            sender: Some(self.service_address.clone()),
            unread_only: true,
            max_results: self.search_top,
        };
        let candidates = self.mail.search_messages(&self.mailbox, &filter).await?;
        for candidate in candidates {
            if !self.tracker.is_handled(&candidate.id).await? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    async fn process_item(&self, raw_body: &str) -> Result<usize> {
        let request = parse::parse(raw_body)?;

        let payload = match request.kind {
            RequestKind::Weather => self.fetch_weather_payload(&request.payload_text).await?,
            RequestKind::Chat => self.chat_payload(&request.payload_text).await?,
        };

        let frames = codec::encode(&payload, self.split_length);
        let wrapped: Vec<String> = frames.iter().map(codec::wrap).collect();
        info!(frames = wrapped.len(), bytes = payload.len(), "delivering payload");

        let outcomes = self.dispatcher.deliver(&request.reply_url, &wrapped).await?;
        let delivered = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - delivered;
        if failed > 0 {
            warn!(delivered, failed, "partial frame delivery");
        }
        Ok(delivered)
    }

    /// Issue the downstream query and wait for its correlated reply.
    async fn fetch_weather_payload(&self, payload_text: &str) -> Result<Vec<u8>> {
        let command = format!("send {}", payload_text.trim());
        self.mail
            .send_message(&self.mailbox, &self.query_address, "", &command)
            .await?;
        info!(command = %command, to = %self.query_address, "downstream query issued");

        let reply = match self
            .poller
            .await_reply(
                self.mail.as_ref(),
                &self.mailbox,
                &self.response_address,
                &command,
            )
            .await?
        {
            PollOutcome::Matched(reply) => reply,
            PollOutcome::TimedOut => {
                return Err(Error::CorrelationTimeout {
                    command,
                    timeout_secs: self.poller.timeout().as_secs(),
                });
            },
        };

        let bytes = self
            .mail
            .fetch_attachment(&self.mailbox, &reply.id, &self.attachment_suffix)
            .await?;

        // Consume the matched reply whether or not it carried a payload;
        // its siblings stay unread for other in-flight polls.
        self.mail.mark_read(&self.mailbox, &reply.id).await?;

        bytes.ok_or(Error::AttachmentMissing {
            message_id: reply.id,
        })
    }

    async fn chat_payload(&self, prompt: &str) -> Result<Vec<u8>> {
        let Some(responder) = &self.chat else {
            return Err(Error::ChatUnavailable);
        };
        let text = responder
            .respond(prompt)
            .await
            .map_err(|e| Error::Chat {
                message: e.to_string(),
            })?;
        Ok(text.into_bytes())
    }

    /// Best-effort single diagnostic frame; must never propagate an error.
    async fn send_diagnostic(&self, reply_url: &str, category: FailureCategory) {
        let frame = codec::Frame {
            index: 1,
            total: 1,
            payload: category.diagnostic_text().to_string(),
        };
        let wrapped = vec![codec::wrap(&frame)];
        match self.dispatcher.deliver(reply_url, &wrapped).await {
            Ok(_) => info!(?category, "diagnostic frame sent"),
            Err(e) => warn!(error = %e, ?category, "diagnostic frame could not be sent"),
        }
    }

    /// Mark the item handled. A failure here is logged, not propagated:
    /// the item will be re-seen, and at-least-once is the contract.
    async fn commit(&self, item_id: &str) {
        if let Err(e) = self.tracker.mark_handled(item_id).await {
            error!(item_id, error = %e, "failed to mark item handled");
        }
    }
}

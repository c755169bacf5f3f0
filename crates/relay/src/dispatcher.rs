//! Ordered, paced frame delivery with per-frame failure accounting.

use std::{sync::Arc, time::Duration};

use {
    tracing::{error, info},
    url::Url,
};

use crate::{
    Error, Result,
    transport::{ReplyForm, ReplyTransport},
};

/// What to do when one frame's delivery fails.
///
/// The channel is store-and-forward, so a later frame succeeding does not
/// depend on an earlier one. Best-effort is therefore the default: log,
/// record the failure, and keep sending. Fail-fast aborts the remaining
/// frames on the first non-success status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    #[default]
    BestEffort,
    FailFast,
}

/// Per-frame delivery result. Never persisted; only reported to the caller.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub index: u32,
    pub success: bool,
    pub status_detail: String,
}

/// Extract the correlation token from a reply destination URL.
///
/// The device network embeds it as the `extId` query parameter; `extid` is
/// accepted as a legacy case variant.
pub fn extract_token(reply_url: &str) -> Result<String> {
    let parsed = Url::parse(reply_url).map_err(|source| Error::InvalidUrl {
        url: reply_url.to_string(),
        source,
    })?;

    parsed
        .query_pairs()
        .find(|(key, value)| (key == "extId" || key == "extid") && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| Error::missing_token(reply_url))
}

/// Sends an ordered sequence of wrapped frames to one destination.
pub struct RelayDispatcher {
    transport: Arc<dyn ReplyTransport>,
    reply_address: String,
    pacing: Duration,
    policy: FailurePolicy,
}

impl RelayDispatcher {
    #[must_use]
    pub fn new(transport: Arc<dyn ReplyTransport>, reply_address: impl Into<String>) -> Self {
        Self {
            transport,
            reply_address: reply_address.into(),
            pacing: Duration::from_secs(5),
            policy: FailurePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Deliver `frames` (already wrapped) in order, waiting the pacing delay
    /// between consecutive sends but not after the last.
    ///
    /// Under [`FailurePolicy::BestEffort`] the returned list covers every
    /// frame; under [`FailurePolicy::FailFast`] the first non-success status
    /// aborts the remainder with [`Error::FrameRejected`].
    pub async fn deliver(&self, reply_url: &str, frames: &[String]) -> Result<Vec<DeliveryOutcome>> {
        let token = extract_token(reply_url)?;
        let total = frames.len() as u32;
        let mut outcomes = Vec::with_capacity(frames.len());

        for (i, wrapped) in frames.iter().enumerate() {
            let index = i as u32 + 1;
            info!(index, total, "sending frame");

            let form = ReplyForm {
                reply_address: self.reply_address.clone(),
                reply_message: wrapped.clone(),
                message_id: uuid::Uuid::new_v4().to_string(),
                token: token.clone(),
            };

            match self.transport.post_reply(reply_url, &form).await {
                Ok(reply) if reply.is_success() => {
                    info!(index, total, "frame sent");
                    outcomes.push(DeliveryOutcome {
                        index,
                        success: true,
                        status_detail: reply.status.to_string(),
                    });
                },
                Ok(reply) => {
                    let status_detail = format!("{} {}", reply.status, reply.body);
                    error!(index, total, status = reply.status, "frame rejected");
                    if self.policy == FailurePolicy::FailFast {
                        return Err(Error::FrameRejected {
                            index,
                            total,
                            status_detail,
                        });
                    }
                    outcomes.push(DeliveryOutcome {
                        index,
                        success: false,
                        status_detail,
                    });
                },
                Err(e) => {
                    error!(index, total, error = %e, "frame send failed");
                    if self.policy == FailurePolicy::FailFast {
                        return Err(e);
                    }
                    outcomes.push(DeliveryOutcome {
                        index,
                        success: false,
                        status_detail: e.to_string(),
                    });
                },
            }

            if i + 1 < frames.len() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        Ok(outcomes)
    }
}

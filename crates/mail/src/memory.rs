//! In-memory [`MailGateway`] for deterministic tests.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::{
    Result,
    gateway::{MailGateway, MailMessage, SearchFilter},
};

/// A mail recorded by [`MemoryMailGateway::send_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub mailbox: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    message: MailMessage,
    unread: bool,
    attachments: Vec<(String, Vec<u8>)>,
}

#[derive(Default)]
struct Inner {
    messages: Vec<StoredMessage>,
    sent: Vec<OutboundMail>,
}

/// Mailbox fake backed by a vector. Messages are visible to searches as
/// soon as they are seeded, so tests can stage replies "mid-poll".
#[derive(Default)]
pub struct MemoryMailGateway {
    inner: RwLock<Inner>,
}

impl MemoryMailGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an unread message, optionally with named attachments.
    pub fn seed_message(&self, message: MailMessage, attachments: Vec<(String, Vec<u8>)>) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.messages.push(StoredMessage {
            message,
            unread: true,
            attachments,
        });
    }

    /// All mails sent through the gateway, in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<OutboundMail> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.sent.clone()
    }

    /// Whether a seeded message is still unread.
    #[must_use]
    pub fn is_unread(&self, message_id: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .messages
            .iter()
            .any(|m| m.message.id == message_id && m.unread)
    }
}

#[async_trait]
impl MailGateway for MemoryMailGateway {
    async fn search_messages(
        &self,
        _mailbox: &str,
        filter: &SearchFilter,
    ) -> Result<Vec<MailMessage>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut hits: Vec<MailMessage> = inner
            .messages
            .iter()
            .filter(|m| !filter.unread_only || m.unread)
            .filter(|m| {
                filter
                    .sender
                    .as_ref()
                    .is_none_or(|s| m.message.sender_address.eq_ignore_ascii_case(s))
            })
            .map(|m| m.message.clone())
            .collect();

        hits.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        if filter.max_results > 0 {
            hits.truncate(filter.max_results);
        }
        Ok(hits)
    }

    async fn mark_read(&self, _mailbox: &str, message_id: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        for stored in &mut inner.messages {
            if stored.message.id == message_id {
                stored.unread = false;
            }
        }
        Ok(())
    }

    async fn send_message(&self, mailbox: &str, to: &str, subject: &str, body: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.sent.push(OutboundMail {
            mailbox: mailbox.to_string(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn fetch_attachment(
        &self,
        _mailbox: &str,
        message_id: &str,
        name_suffix: &str,
    ) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let Some(stored) = inner.messages.iter().find(|m| m.message.id == message_id) else {
            return Ok(None);
        };
        Ok(stored
            .attachments
            .iter()
            .find(|(name, _)| {
                name.len() >= name_suffix.len()
                    && name[name.len() - name_suffix.len()..].eq_ignore_ascii_case(name_suffix)
            })
            .map(|(_, bytes)| bytes.clone()))
    }
}

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

use crate::{Result, html::html_to_text};

/// One message as seen by the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: String,
    pub body_text: String,
    pub body_is_html: bool,
    pub sender_address: String,
    pub received_at: DateTime<Utc>,
}

impl MailMessage {
    /// Body as plain text, flattening HTML when the mail carries it.
    #[must_use]
    pub fn flattened_body(&self) -> String {
        if self.body_is_html {
            html_to_text(&self.body_text)
        } else {
            self.body_text.clone()
        }
    }
}

/// Inbox search parameters.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Only messages from this sender address.
    pub sender: Option<String>,
    /// Only messages not yet marked read.
    pub unread_only: bool,
    /// Max messages returned.
    pub max_results: usize,
}

/// Capability seam over the mailbox.
///
/// Implementations return search results ordered by receipt time, newest
/// first.
#[async_trait]
pub trait MailGateway: Send + Sync {
    async fn search_messages(
        &self,
        mailbox: &str,
        filter: &SearchFilter,
    ) -> Result<Vec<MailMessage>>;

    async fn mark_read(&self, mailbox: &str, message_id: &str) -> Result<()>;

    async fn send_message(&self, mailbox: &str, to: &str, subject: &str, body: &str) -> Result<()>;

    /// Bytes of the first attachment whose name ends with `name_suffix`
    /// (case-insensitive), or `None` if the message has no such attachment.
    async fn fetch_attachment(
        &self,
        mailbox: &str,
        message_id: &str,
        name_suffix: &str,
    ) -> Result<Option<Vec<u8>>>;
}

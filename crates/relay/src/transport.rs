//! HTTP seam for posting one reply message to the device network.

use {async_trait::async_trait, tracing::debug};

use crate::Result;

/// Form fields the device network expects for one reply message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyForm {
    /// Address shown to the device as the reply sender.
    pub reply_address: String,
    /// The wrapped frame text.
    pub reply_message: String,
    /// Fresh id per send attempt.
    pub message_id: String,
    /// Correlation token extracted from the reply URL.
    pub token: String,
}

/// Status and body of one reply post.
#[derive(Debug, Clone)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

impl TransportReply {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Capability seam over the device reply endpoint.
#[async_trait]
pub trait ReplyTransport: Send + Sync {
    async fn post_reply(&self, url: &str, form: &ReplyForm) -> Result<TransportReply>;
}

// ── Production implementation ───────────────────────────────────────────────

/// Static headers the explore.garmin.com endpoint requires; without them the
/// post is rejected as a cross-site request.
const STATIC_HEADERS: &[(&str, &str)] = &[
    ("authority", "explore.garmin.com"),
    ("accept", "*/*"),
    ("accept-language", "en-US,en;q=0.9"),
    (
        "content-type",
        "application/x-www-form-urlencoded; charset=UTF-8",
    ),
    ("origin", "https://explore.garmin.com"),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
    ("user-agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
    ("x-requested-with", "XMLHttpRequest"),
];

const STATIC_COOKIE: &str = "BrowsingMode=Desktop";

/// Posts replies to the Garmin inReach web endpoint.
pub struct GarminReplyTransport {
    client: reqwest::Client,
}

impl GarminReplyTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for GarminReplyTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplyTransport for GarminReplyTransport {
    async fn post_reply(&self, url: &str, form: &ReplyForm) -> Result<TransportReply> {
        debug!(url, chunk_len = form.reply_message.len(), "posting device reply");

        let mut req = self.client.post(url).header("cookie", STATIC_COOKIE);
        for (name, value) in STATIC_HEADERS {
            req = req.header(*name, *value);
        }

        let resp = req
            .form(&[
                ("ReplyAddress", form.reply_address.as_str()),
                ("ReplyMessage", form.reply_message.as_str()),
                ("MessageId", form.message_id.as_str()),
                ("Guid", form.token.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Ok(TransportReply { status, body })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_posts_form_with_static_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/TextMessage/TxtMsg")
            .match_header("x-requested-with", "XMLHttpRequest")
            .match_header("cookie", "BrowsingMode=Desktop")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("ReplyAddress".into(), "relay@x.com".into()),
                mockito::Matcher::UrlEncoded("ReplyMessage".into(), "msg 1/1:\nQQ==\nend".into()),
                mockito::Matcher::UrlEncoded("Guid".into(), "TOKEN-1".into()),
            ]))
            .with_status(200)
            .with_body("OK")
            .create();

        let transport = GarminReplyTransport::new();
        let form = ReplyForm {
            reply_address: "relay@x.com".into(),
            reply_message: "msg 1/1:\nQQ==\nend".into(),
            message_id: "id-1".into(),
            token: "TOKEN-1".into(),
        };
        let reply = transport
            .post_reply(&format!("{}/TextMessage/TxtMsg", server.url()), &form)
            .await
            .unwrap();

        assert!(reply.is_success());
        assert_eq!(reply.body, "OK");
        mock.assert();
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported_not_raised() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/TextMessage/TxtMsg")
            .with_status(500)
            .with_body("boom")
            .create();

        let transport = GarminReplyTransport::new();
        let form = ReplyForm {
            reply_address: "relay@x.com".into(),
            reply_message: "m".into(),
            message_id: "id".into(),
            token: "t".into(),
        };
        let reply = transport
            .post_reply(&format!("{}/TextMessage/TxtMsg", server.url()), &form)
            .await
            .unwrap();
        assert!(!reply.is_success());
        assert_eq!(reply.status, 500);
    }
}

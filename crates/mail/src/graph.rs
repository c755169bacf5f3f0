//! Microsoft Graph implementation of [`MailGateway`].
//!
//! Authenticates with the client-credentials flow and caches the token
//! in-process until shortly before expiry.

use {
    async_trait::async_trait,
    base64::{Engine as _, engine::general_purpose::STANDARD as BASE64},
    chrono::{DateTime, Utc},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tokio::{sync::Mutex, time::Instant},
    tracing::debug,
};

use spindrift_config::GraphConfig;

use crate::{
    Error, Result,
    gateway::{MailGateway, MailMessage, SearchFilter},
};

const DEFAULT_GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_LOGIN_BASE: &str = "https://login.microsoftonline.com";

/// Seconds subtracted from a token's lifetime before it counts as expired.
const TOKEN_EXPIRY_SLACK_SECS: u64 = 60;

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct GraphMailGateway {
    client: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: Secret<String>,
    graph_base: String,
    login_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl GraphMailGateway {
    #[must_use]
    pub fn new(config: &GraphConfig) -> Self {
        Self::with_endpoints(config, DEFAULT_GRAPH_BASE, DEFAULT_LOGIN_BASE)
    }

    /// Construct against custom endpoints. Used by tests to point at a
    /// local mock server.
    #[must_use]
    pub fn with_endpoints(config: &GraphConfig, graph_base: &str, login_base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            tenant_id: config.tenant_id.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            graph_base: graph_base.trim_end_matches('/').to_string(),
            login_base: login_base.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        }
    }

    async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/{}/oauth2/v2.0/token", self.login_base, self.tenant_id);
        let resp = self
            .client
            .post(&url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("scope", "https://graph.microsoft.com/.default"),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::auth(format!("token request failed ({status}): {body}")));
        }

        let body: TokenResponse = resp.json().await?;
        let lifetime = body.expires_in.saturating_sub(TOKEN_EXPIRY_SLACK_SECS);
        debug!(lifetime_secs = lifetime, "acquired Graph access token");

        let value = body.access_token.clone();
        *cached = Some(CachedToken {
            value: body.access_token,
            expires_at: Instant::now() + std::time::Duration::from_secs(lifetime),
        });
        Ok(value)
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(Error::api(status, body))
        }
    }
}

#[async_trait]
impl MailGateway for GraphMailGateway {
    async fn search_messages(
        &self,
        mailbox: &str,
        filter: &SearchFilter,
    ) -> Result<Vec<MailMessage>> {
        let token = self.bearer_token().await?;

        let mut clauses = Vec::new();
        if let Some(sender) = &filter.sender {
            clauses.push(format!("from/emailAddress/address eq '{sender}'"));
        }
        if filter.unread_only {
            clauses.push("isRead eq false".to_string());
        }

        let url = format!("{}/users/{mailbox}/messages", self.graph_base);
        let mut req = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&[
                ("$top", filter.max_results.to_string()),
                ("$select", "id,from,body,receivedDateTime".to_string()),
            ]);
        if !clauses.is_empty() {
            req = req.query(&[("$filter", clauses.join(" and "))]);
        }

        // Graph returns newest-first by default; no explicit $orderby, which
        // conflicts with $filter on some tenants.
        let resp = Self::check_status(req.send().await?).await?;
        let list: MessageList = resp.json().await?;

        Ok(list.value.into_iter().map(GraphMessage::into_message).collect())
    }

    async fn mark_read(&self, mailbox: &str, message_id: &str) -> Result<()> {
        let token = self.bearer_token().await?;
        let url = format!("{}/users/{mailbox}/messages/{message_id}", self.graph_base);
        let resp = self
            .client
            .patch(&url)
            .bearer_auth(&token)
            .json(&serde_json::json!({ "isRead": true }))
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn send_message(&self, mailbox: &str, to: &str, subject: &str, body: &str) -> Result<()> {
        let token = self.bearer_token().await?;
        let url = format!("{}/users/{mailbox}/sendMail", self.graph_base);
        let payload = serde_json::json!({
            "message": {
                "subject": subject,
                "body": { "contentType": "Text", "content": body },
                "toRecipients": [
                    { "emailAddress": { "address": to } }
                ],
            },
            "saveToSentItems": true,
        });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn fetch_attachment(
        &self,
        mailbox: &str,
        message_id: &str,
        name_suffix: &str,
    ) -> Result<Option<Vec<u8>>> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/users/{mailbox}/messages/{message_id}/attachments",
            self.graph_base
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&[("$select", "name,contentBytes")])
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        let list: AttachmentList = resp.json().await?;

        for attachment in list.value {
            let Some(name) = attachment.name else { continue };
            let Some(content) = attachment.content_bytes else {
                continue;
            };
            if ends_with_ignore_case(&name, name_suffix) {
                return Ok(Some(BASE64.decode(content)?));
            }
        }
        Ok(None)
    }
}

fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

// ── Graph wire types ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    value: Vec<GraphMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage {
    id: String,
    received_date_time: Option<DateTime<Utc>>,
    from: Option<GraphFrom>,
    body: Option<GraphBody>,
}

impl GraphMessage {
    fn into_message(self) -> MailMessage {
        let (body_text, body_is_html) = match self.body {
            Some(body) => (
                body.content.unwrap_or_default(),
                body.content_type
                    .is_some_and(|t| t.eq_ignore_ascii_case("html")),
            ),
            None => (String::new(), false),
        };
        let sender_address = self
            .from
            .and_then(|f| f.email_address)
            .and_then(|a| a.address)
            .unwrap_or_default();
        MailMessage {
            id: self.id,
            body_text,
            body_is_html,
            sender_address,
            received_at: self.received_date_time.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphBody {
    content: Option<String>,
    content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphFrom {
    email_address: Option<GraphAddress>,
}

#[derive(Debug, Deserialize)]
struct GraphAddress {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentList {
    #[serde(default)]
    value: Vec<GraphAttachment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphAttachment {
    name: Option<String>,
    content_bytes: Option<String>,
}

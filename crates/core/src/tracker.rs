//! Idempotency tracking for inbound items.
//!
//! Two interchangeable strategies, selected by deployment config. Both
//! commit strictly *after* side effects have been durably attempted: a
//! crash between processing and marking leaves the item eligible for a
//! safe retry on the next scheduled invocation.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tokio::{fs, io::AsyncWriteExt},
    tracing::debug,
};

use spindrift_mail::MailGateway;

use crate::Result;

/// Guards one inbound item against double-processing.
#[async_trait]
pub trait IdempotencyTracker: Send + Sync {
    /// Whether the item was already fully processed.
    async fn is_handled(&self, item_id: &str) -> Result<bool>;

    /// Record the item as processed. Called only after its side effects
    /// completed (successfully or terminally).
    async fn mark_handled(&self, item_id: &str) -> Result<()>;
}

// ── Strategy (a): the mailbox read/unread flag ──────────────────────────────

/// Delegates to the mailbox's own read flag. Unread searches already
/// exclude handled items, so `is_handled` never has to consult anything.
pub struct MailboxFlagTracker {
    mail: Arc<dyn MailGateway>,
    mailbox: String,
}

impl MailboxFlagTracker {
    #[must_use]
    pub fn new(mail: Arc<dyn MailGateway>, mailbox: impl Into<String>) -> Self {
        Self {
            mail,
            mailbox: mailbox.into(),
        }
    }
}

#[async_trait]
impl IdempotencyTracker for MailboxFlagTracker {
    async fn is_handled(&self, _item_id: &str) -> Result<bool> {
        Ok(false)
    }

    async fn mark_handled(&self, item_id: &str) -> Result<()> {
        self.mail.mark_read(&self.mailbox, item_id).await?;
        Ok(())
    }
}

// ── Strategy (b): explicit append-only log ──────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct HandledRecord {
    id: String,
    handled_at_ms: u64,
}

/// Append-only JSONL log of handled item ids.
///
/// The file is appended, never rewritten; a torn final line (crash mid-
/// append) is skipped on load rather than corrupting the log.
pub struct HandledLogTracker {
    path: PathBuf,
    seen: tokio::sync::Mutex<HashSet<String>>,
}

impl HandledLogTracker {
    /// Open (or create) the log at `path` and load the handled set.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let seen = Self::load(&path).await?;
        debug!(path = %path.display(), handled = seen.len(), "loaded handled log");
        Ok(Self {
            path,
            seen: tokio::sync::Mutex::new(seen),
        })
    }

    async fn load(path: &Path) -> Result<HashSet<String>> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Ok(HashSet::new());
        }
        let data = fs::read_to_string(path).await?;
        Ok(data
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str::<HandledRecord>(l).ok())
            .map(|r| r.id)
            .collect())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[async_trait]
impl IdempotencyTracker for HandledLogTracker {
    async fn is_handled(&self, item_id: &str) -> Result<bool> {
        Ok(self.seen.lock().await.contains(item_id))
    }

    async fn mark_handled(&self, item_id: &str) -> Result<()> {
        let mut seen = self.seen.lock().await;
        if seen.contains(item_id) {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let record = HandledRecord {
            id: item_id.to_string(),
            handled_at_ms: now_ms(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?
            .write_all(line.as_bytes())
            .await?;

        seen.insert(item_id.to_string());
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, tempfile::TempDir};

    #[tokio::test]
    async fn test_log_tracker_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("handled.jsonl");

        let tracker = HandledLogTracker::open(&path).await.unwrap();
        assert!(!tracker.is_handled("a").await.unwrap());

        tracker.mark_handled("a").await.unwrap();
        assert!(tracker.is_handled("a").await.unwrap());

        // a fresh open sees the persisted id
        let reopened = HandledLogTracker::open(&path).await.unwrap();
        assert!(reopened.is_handled("a").await.unwrap());
        assert!(!reopened.is_handled("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_log_is_append_only() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("handled.jsonl");

        let tracker = HandledLogTracker::open(&path).await.unwrap();
        tracker.mark_handled("a").await.unwrap();
        tracker.mark_handled("b").await.unwrap();
        tracker.mark_handled("a").await.unwrap(); // de-duplicated

        let data = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = data.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"a\""));
        assert!(lines[1].contains("\"b\""));
    }

    #[tokio::test]
    async fn test_torn_final_line_is_skipped_on_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("handled.jsonl");
        std::fs::write(
            &path,
            "{\"id\":\"a\",\"handled_at_ms\":1}\n{\"id\":\"b\",\"handled",
        )
        .unwrap();

        let tracker = HandledLogTracker::open(&path).await.unwrap();
        assert!(tracker.is_handled("a").await.unwrap());
        assert!(!tracker.is_handled("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_mailbox_tracker_marks_read() {
        use {chrono::Utc, spindrift_mail::{MailMessage, MemoryMailGateway}};

        let mail = Arc::new(MemoryMailGateway::new());
        mail.seed_message(
            MailMessage {
                id: "m1".into(),
                body_text: "x".into(),
                body_is_html: false,
                sender_address: "svc@x.com".into(),
                received_at: Utc::now(),
            },
            vec![],
        );

        let tracker = MailboxFlagTracker::new(mail.clone(), "box@x.com");
        assert!(!tracker.is_handled("m1").await.unwrap());
        tracker.mark_handled("m1").await.unwrap();
        assert!(!mail.is_unread("m1"));
    }
}

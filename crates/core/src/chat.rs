//! Seam for the optional natural-language chat collaborator.

use async_trait::async_trait;

/// Answers free-text prompts from the device.
///
/// This is an external collaborator; the core only defines the seam. A
/// deployment without a responder rejects chat requests with a diagnostic
/// reply instead.
#[async_trait]
pub trait ChatResponder: Send + Sync {
    async fn respond(&self, prompt: &str) -> anyhow::Result<String>;
}

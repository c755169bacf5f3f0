use thiserror::Error;

use crate::parse::ParseError;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for one orchestrator invocation.
///
/// Parse, timeout, and missing-payload failures are terminal for the item;
/// mailbox/HTTP failures are transport-level and leave the item eligible
/// for the next scheduled invocation.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// No downstream reply matched the command before the deadline.
    #[error("no downstream reply for '{command}' within {timeout_secs}s")]
    CorrelationTimeout { command: String, timeout_secs: u64 },

    /// The matched reply carries no payload attachment.
    #[error("downstream reply {message_id} has no payload attachment")]
    AttachmentMissing { message_id: String },

    /// A chat request arrived but no chat collaborator is wired in.
    #[error("chat responder not configured")]
    ChatUnavailable,

    /// The chat collaborator failed.
    #[error("chat responder failed: {message}")]
    Chat { message: String },

    #[error(transparent)]
    Codec(#[from] spindrift_codec::Error),

    #[error(transparent)]
    Mail(#[from] spindrift_mail::Error),

    #[error(transparent)]
    Relay(#[from] spindrift_relay::Error),

    /// Handled-log I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

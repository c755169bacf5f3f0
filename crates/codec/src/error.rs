use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Codec-level failures. Malformed frame sequences are surfaced to the
/// caller, never silently repaired.
#[derive(Debug, Error)]
pub enum Error {
    /// A wrapped block does not match the `msg i/t:` / payload / `end` grammar.
    #[error("malformed frame block: {message}")]
    Format { message: String },

    /// The frame set does not cover exactly indices `1..=total`.
    #[error("incomplete frame sequence: {message}")]
    IncompleteSequence { message: String },

    /// Reassembled text is not valid base64.
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
}

impl Error {
    #[must_use]
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn incomplete(message: impl Into<String>) -> Self {
        Self::IncompleteSequence {
            message: message.into(),
        }
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The Graph API answered with a non-success status.
    #[error("mail API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Token acquisition failed.
    #[error("mail auth failed: {message}")]
    Auth { message: String },

    /// An attachment's content could not be decoded.
    #[error("attachment decode failed: {0}")]
    AttachmentDecode(#[from] base64::DecodeError),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }
}

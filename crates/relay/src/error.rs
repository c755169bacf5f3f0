use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The reply destination URL does not carry a correlation token.
    #[error("no extId token in reply URL: {url}")]
    MissingToken { url: String },

    /// The reply destination could not be parsed as a URL.
    #[error("invalid reply URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// A frame send came back with a non-success status (fail-fast policy).
    #[error("frame {index}/{total} rejected: {status_detail}")]
    FrameRejected {
        index: u32,
        total: u32,
        status_detail: String,
    },
}

impl Error {
    #[must_use]
    pub fn missing_token(url: impl Into<String>) -> Self {
        Self::MissingToken { url: url.into() }
    }
}

use thiserror::Error;

/// Failures of the HTTP round trips to the auth and permission endpoints
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid endpoint url: {0}")]
    Url(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(e)
        }
    }
}

/// Failures reading or writing persisted session state
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Login failures. None of them are retried.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no access token")]
    NoAccessToken,

    #[error("no user id")]
    NoUserId,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to persist session: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action: {0:?}")]
pub struct ParseActionError(pub String);

use thiserror::Error;

/// Errors returned to callers of client operations.
///
/// Transport and decode problems on the live connection never show up here;
/// they are absorbed by the net layer.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Request could not be sent or the response body not read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a failure envelope.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Access token missing, expired or rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Operation needs a signed-in user.
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Response carried no data")]
    EmptyResponse,

    #[error("Invalid resource id: {0}")]
    InvalidId(i64),

    #[error("Missing hand-off value: {0}")]
    MissingHandoff(&'static str),

    /// The view's reconciliation loop has stopped.
    #[error("Live view closed")]
    ViewClosed,
}

impl ClientError {
    /// Whether this error should drop the session back to guest.
    pub fn clears_session(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;

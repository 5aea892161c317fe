use thiserror::Error;

/// Errors decoding or validating inbound bus messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unexpected destination: {0}")]
    UnexpectedDestination(String),

    #[error("Payload too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}

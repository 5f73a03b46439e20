use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Network request failed: {0}")]
    Network(String),

    #[error("Media element rejected the request: {0}")]
    MediaRejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` when the failure came from the transport rather than
    /// from the collaborator's own answer.
    pub fn is_network(&self) -> bool {
        matches!(self, BridgeError::Network(_) | BridgeError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

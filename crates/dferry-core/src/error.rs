use thiserror::Error;

pub type FerryResult<T> = Result<T, FerryError>;

/// Terminal errors a transfer can surface. Each one halts the transfer;
/// nothing is retried automatically.
#[derive(Debug, Error)]
pub enum FerryError {
    /// Rejected before any network interaction (e.g. oversize file).
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown file id (the service's `{ code: 404 }` answer).
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid access token (the service's `{ code: 403 }` answer).
    #[error("authorization error: {0}")]
    Authorization(String),

    /// AEAD tag mismatch on decrypt (wrong password or corrupted data).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Request failure, abort, or a non-success status with a server message.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed key-derivation inputs (a wrong password is not detected
    /// here; it surfaces later as an authentication failure).
    #[error("key derivation error: {0}")]
    KeyDerivation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

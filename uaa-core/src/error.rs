use thiserror::Error;

/// Errors raised while loading keys, signing or decoding tokens
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Failed to decode token: {0}")]
    Decoding(String),
}

/// Errors raised by the resource stores
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Resource {0} does not exist")]
    NotFound(String),

    #[error("Resource name already in use: {0}")]
    Conflict(String),

    #[error("Version mismatch: expected {expected}, stored {actual}")]
    VersionMismatch { expected: u64, actual: u64 },
}

/// A create or update document failed entity validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self(message.into())
    }
}

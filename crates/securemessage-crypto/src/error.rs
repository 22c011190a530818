//! Crypto error types.

/// Result type alias using [`CryptoError`].
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors from identity construction, key resolution and the envelope codec.
///
/// `DecryptionFailed` and `KeyUnwrapFailed` never carry a cause: a bad key,
/// a tampered ciphertext and a malformed recovered payload all look the same.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Could not obtain a session key: {0}")]
    KeyResolutionFailed(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Could not decrypt message")]
    DecryptionFailed,

    #[error("Could not decrypt the session key")]
    KeyUnwrapFailed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

use thiserror::Error;

/// Error type for ID generation.
#[derive(Debug, Clone, Error)]
pub enum IdGeneratorError {
    #[error("Secure random source failed: {0}")]
    RandomSource(String),
}

/// Error type for signature extraction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("Signed value has an invalid format")]
    InvalidFormat,

    #[error("Unknown signer version: {0}")]
    UnknownVersion(String),

    #[error("Signature is invalid")]
    InvalidSignature,
}

/// Error type for encryption and decryption.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CrypterError {
    #[error("Encrypted value has an invalid format")]
    InvalidFormat,

    #[error("Unknown crypter version: {0}")]
    UnknownVersion(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

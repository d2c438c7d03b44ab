use thiserror::Error;

/// Error type for JWT operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Failed to decode token: {0}")]
    DecodingFailed(String),

    #[error("Token signature verification failed")]
    InvalidSignature,

    #[error("Token was issued by an unexpected issuer")]
    InvalidIssuer,

    #[error("Token subject is invalid: {0}")]
    InvalidSubject(String),

    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    #[error("Custom claim overrides reserved claim: {0}")]
    ReservedClaim(String),
}

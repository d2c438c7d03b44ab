use std::fmt;

use thiserror::Error;

use crate::crypto::CrypterError;
use crate::crypto::IdGeneratorError;
use crate::jwt::JwtError;

/// Lifecycle operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Retrieve,
    Init,
    Update,
    Renew,
    Discard,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Retrieve => "retrieve",
            Operation::Init => "init",
            Operation::Update => "update",
            Operation::Renew => "renew",
            Operation::Discard => "discard",
        };
        f.write_str(name)
    }
}

/// Error type for authenticator stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Authenticator store failed: {0}")]
    Storage(String),

    #[error("Stored authenticator is unreadable: {0}")]
    Serialization(String),
}

/// Underlying reason an authenticator operation failed.
#[derive(Debug, Clone, Error)]
pub enum AuthenticatorCause {
    #[error(transparent)]
    IdGenerator(#[from] IdGeneratorError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Crypter(#[from] CrypterError),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Failure of a lifecycle operation, tagged with the carrier and operation.
///
/// Callers fail the current authentication attempt on this error; none of the
/// causes are worth retrying within the same request.
#[derive(Debug, Clone, Error)]
#[error("[{authenticator}] Could not {operation} authenticator")]
pub struct AuthenticatorError {
    pub authenticator: &'static str,
    pub operation: Operation,
    #[source]
    pub cause: AuthenticatorCause,
}

impl AuthenticatorError {
    pub fn new(
        authenticator: &'static str,
        operation: Operation,
        cause: impl Into<AuthenticatorCause>,
    ) -> Self {
        Self {
            authenticator,
            operation,
            cause: cause.into(),
        }
    }
}

/// Build a `map_err` adapter for one carrier and operation.
pub(crate) fn failed<E: Into<AuthenticatorCause>>(
    authenticator: &'static str,
    operation: Operation,
) -> impl FnOnce(E) -> AuthenticatorError {
    move |cause| AuthenticatorError::new(authenticator, operation, cause)
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_message_names_carrier_and_operation() {
        let error = AuthenticatorError::new(
            "cookie-authenticator",
            Operation::Create,
            IdGeneratorError::RandomSource("unavailable".to_string()),
        );

        assert_eq!(
            error.to_string(),
            "[cookie-authenticator] Could not create authenticator"
        );
        assert_eq!(
            error.source().unwrap().to_string(),
            "Secure random source failed: unavailable"
        );
    }
}

use thiserror::Error;

use super::AuthInfoKind;

/// Error type for auth-info persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthInfoError {
    #[error("No store is registered for {0} auth info")]
    NoStore(AuthInfoKind),

    #[error("Store for {expected} auth info returned {actual} auth info")]
    UnexpectedKind {
        expected: AuthInfoKind,
        actual: AuthInfoKind,
    },

    #[error("No {kind} auth info exists for {login_info}")]
    NotFound {
        kind: AuthInfoKind,
        login_info: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

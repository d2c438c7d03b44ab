//! Shared validation for settings structures.
//!
//! Every settings struct in this crate exposes a `validate` method built from
//! these checks. Services call it in their constructors so configuration
//! errors surface at startup rather than on the first request.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use url::Url;

/// Error raised when a settings structure is invalid.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid URL for `{field}`: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("`{0}` must not be empty")]
    Empty(&'static str),

    #[error("`{0}` must be a positive duration")]
    NonPositiveDuration(&'static str),

    #[error("`{0}` is too large to be represented as a point in time")]
    DurationOutOfRange(&'static str),

    #[error("`{field}` must be at least {minimum} bytes, got {actual}")]
    SecretTooShort {
        field: &'static str,
        minimum: usize,
        actual: usize,
    },
}

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty(field));
    }
    Ok(())
}

pub(crate) fn require_positive(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(ConfigError::NonPositiveDuration(field));
    }

    let representable = chrono::Duration::from_std(value)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d))
        .is_some();
    if !representable {
        return Err(ConfigError::DurationOutOfRange(field));
    }

    Ok(())
}

pub(crate) fn require_optional_positive(
    field: &'static str,
    value: Option<Duration>,
) -> Result<(), ConfigError> {
    match value {
        Some(duration) => require_positive(field, duration),
        None => Ok(()),
    }
}

pub(crate) fn require_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })
}

pub(crate) fn require_secret(
    field: &'static str,
    value: &str,
    minimum: usize,
) -> Result<(), ConfigError> {
    if value.len() < minimum {
        return Err(ConfigError::SecretTooShort {
            field,
            minimum,
            actual: value.len(),
        });
    }
    Ok(())
}

/// Convert a validated settings duration into a chrono duration.
pub(crate) fn to_chrono(value: Duration) -> chrono::Duration {
    chrono::Duration::from_std(value).unwrap_or(chrono::Duration::MAX)
}

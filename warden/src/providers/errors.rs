use thiserror::Error;

use crate::auth_info::AuthInfoError;
use crate::crypto::IdGeneratorError;
use crate::password::PasswordError;

/// Failure reported by a host-supplied protocol client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ClientError(pub String);

/// Failure validating the OAuth2 state round trip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("[{provider_id}] State cookie does not exist")]
    ClientStateMissing { provider_id: String },

    #[error("[{provider_id}] State parameter does not exist")]
    ProviderStateMissing { provider_id: String },

    #[error("[{provider_id}] State cookie has an invalid signature")]
    InvalidSignature { provider_id: String },

    #[error("[{provider_id}] State cookie does not contain valid JSON")]
    InvalidJson { provider_id: String },

    #[error("[{provider_id}] State cookie JSON does not describe a state")]
    InvalidShape { provider_id: String },

    #[error("[{provider_id}] State cookie is not in the expected format")]
    InvalidFormat { provider_id: String },

    #[error("[{provider_id}] State is expired")]
    Expired { provider_id: String },

    #[error("[{provider_id}] State parameter does not match the state cookie")]
    NotEqual { provider_id: String },

    #[error("State could not be serialized: {0}")]
    Serialization(String),
}

/// Failure retrieving the OAuth1 token secret from its cookie.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("[{provider_id}] Token secret cookie does not exist")]
    Missing { provider_id: String },

    #[error("[{provider_id}] Token secret cookie has an invalid signature")]
    InvalidSignature { provider_id: String },

    #[error("[{provider_id}] Token secret cookie does not contain valid JSON")]
    InvalidJson { provider_id: String },

    #[error("[{provider_id}] Token secret cookie JSON does not describe a secret")]
    InvalidShape { provider_id: String },

    #[error("[{provider_id}] Token secret cookie is not in the expected format")]
    InvalidFormat { provider_id: String },

    #[error("[{provider_id}] Token secret is expired")]
    Expired { provider_id: String },

    #[error("[{provider_id}] Token secret could not be decrypted")]
    Decryption { provider_id: String },

    #[error("Token secret could not be encrypted: {0}")]
    Encryption(String),

    #[error("Token secret could not be serialized: {0}")]
    Serialization(String),
}

/// Failure authenticating with an identifier and password.
#[derive(Debug, Clone, Error)]
pub enum CredentialsError {
    #[error("[{provider_id}] Could not find identity {identifier}")]
    IdentityNotFound {
        provider_id: &'static str,
        identifier: String,
    },

    #[error("[{provider_id}] Entered password is invalid")]
    InvalidPassword { provider_id: &'static str },

    #[error("[{provider_id}] Stored password uses hasher `{hasher}`, supported hashers are {supported:?}")]
    UnsupportedHasher {
        provider_id: &'static str,
        hasher: String,
        supported: Vec<&'static str>,
    },

    #[error("[credentials] Auth info lookup failed")]
    AuthInfo(#[from] AuthInfoError),

    #[error("[credentials] Password hashing failed")]
    Password(#[from] PasswordError),
}

/// Failure of an OAuth2 authentication flow.
#[derive(Debug, Clone, Error)]
pub enum OAuth2Error {
    #[error("[{provider_id}] User denied access")]
    AccessDenied { provider_id: String },

    #[error("[{provider_id}] Provider returned error `{error}`")]
    Provider { provider_id: String, error: String },

    #[error(transparent)]
    State(#[from] StateError),

    #[error("[{provider_id}] Could not build state")]
    StateGeneration {
        provider_id: String,
        #[source]
        source: IdGeneratorError,
    },

    #[error("[{provider_id}] Access token request failed")]
    AccessToken {
        provider_id: String,
        #[source]
        source: ClientError,
    },

    #[error("[{provider_id}] Access token response is invalid: {reason}")]
    InvalidTokenResponse { provider_id: String, reason: String },

    #[error("[{provider_id}] Profile request failed")]
    ProfileRequest {
        provider_id: String,
        #[source]
        source: ClientError,
    },

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Failure of an OAuth1 authentication flow.
#[derive(Debug, Clone, Error)]
pub enum OAuth1Error {
    #[error("[{provider_id}] User denied access")]
    AccessDenied { provider_id: String },

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("[{provider_id}] Request token could not be retrieved")]
    RequestToken {
        provider_id: String,
        #[source]
        source: ClientError,
    },

    #[error("[{provider_id}] Access token could not be retrieved")]
    AccessToken {
        provider_id: String,
        #[source]
        source: ClientError,
    },
}

/// Failure turning provider JSON into a profile.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("[{provider_id}] Profile field `{field}` is missing")]
    MissingField { provider_id: String, field: String },
}

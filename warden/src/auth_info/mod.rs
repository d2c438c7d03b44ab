//! Provider-specific credential material keyed by [`LoginInfo`].
//!
//! [`AuthInfo`] is a closed sum over the kinds of material the providers in
//! this crate produce. Each kind is routed to its own store by the
//! [`AuthInfoRegistry`], which is assembled once at startup.
//!
//! [`LoginInfo`]: crate::LoginInfo

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

pub mod errors;
pub mod repository;

pub use errors::AuthInfoError;
pub use repository::AuthInfoDao;
pub use repository::AuthInfoRegistry;
pub use repository::AuthInfoRegistryBuilder;
pub use repository::InMemoryAuthInfoDao;

/// Stored password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordInfo {
    /// Tag of the hasher that produced `password`
    pub hasher: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl PasswordInfo {
    pub fn new(hasher: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            hasher: hasher.into(),
            password: password.into(),
            salt: None,
        }
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }
}

/// OAuth1 access token and token secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth1Info {
    pub token: String,
    pub secret: String,
}

/// OAuth2 access token response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Info {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl OAuth2Info {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: None,
            expires_in: None,
            refresh_token: None,
            params: BTreeMap::new(),
        }
    }

    /// Read an access token response body (RFC 6749 section 5.1).
    ///
    /// Returns `None` when `access_token` is missing. Fields other than the
    /// standard ones are kept in `params`.
    pub fn from_token_response(json: &Value) -> Option<Self> {
        let object = json.as_object()?;
        let access_token = object.get("access_token")?.as_str()?.to_string();

        let expires_in = object.get("expires_in").and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        });
        let string = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

        let params = object
            .iter()
            .filter(|(key, _)| !TOKEN_RESPONSE_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect();

        Some(Self {
            access_token,
            token_type: string("token_type"),
            expires_in,
            refresh_token: string("refresh_token"),
            params,
        })
    }
}

const TOKEN_RESPONSE_FIELDS: [&str; 4] = ["access_token", "token_type", "expires_in", "refresh_token"];

/// CAS service ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasInfo {
    pub ticket: String,
}

/// Credential material of any supported kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AuthInfo {
    Password(PasswordInfo),
    #[serde(rename = "oauth1")]
    OAuth1(OAuth1Info),
    #[serde(rename = "oauth2")]
    OAuth2(OAuth2Info),
    Cas(CasInfo),
}

impl AuthInfo {
    pub fn kind(&self) -> AuthInfoKind {
        match self {
            AuthInfo::Password(_) => AuthInfoKind::Password,
            AuthInfo::OAuth1(_) => AuthInfoKind::OAuth1,
            AuthInfo::OAuth2(_) => AuthInfoKind::OAuth2,
            AuthInfo::Cas(_) => AuthInfoKind::Cas,
        }
    }
}

impl From<PasswordInfo> for AuthInfo {
    fn from(info: PasswordInfo) -> Self {
        AuthInfo::Password(info)
    }
}

impl From<OAuth1Info> for AuthInfo {
    fn from(info: OAuth1Info) -> Self {
        AuthInfo::OAuth1(info)
    }
}

impl From<OAuth2Info> for AuthInfo {
    fn from(info: OAuth2Info) -> Self {
        AuthInfo::OAuth2(info)
    }
}

impl From<CasInfo> for AuthInfo {
    fn from(info: CasInfo) -> Self {
        AuthInfo::Cas(info)
    }
}

/// Discriminant of [`AuthInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuthInfoKind {
    Password,
    OAuth1,
    OAuth2,
    Cas,
}

impl fmt::Display for AuthInfoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthInfoKind::Password => "password",
            AuthInfoKind::OAuth1 => "oauth1",
            AuthInfoKind::OAuth2 => "oauth2",
            AuthInfoKind::Cas => "cas",
        };
        f.write_str(name)
    }
}

//! OAuth1 request token secret kept in a signed cookie between the two legs.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::error::Category;

use crate::auth_info::OAuth1Info;
use crate::clock::Clock;
use crate::context::CookieSettings;
use crate::context::RequestContext;
use crate::context::ResponseContext;
use crate::crypto::Crypter;
use crate::crypto::Signer;
use crate::crypto::SignerError;
use crate::providers::errors::SecretError;
use crate::settings::require_positive;
use crate::settings::to_chrono;
use crate::settings::ConfigError;

const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieSecret {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CookieSecret {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CookieSecretSettings {
    pub cookie: CookieSettings,

    #[serde(with = "humantime_serde")]
    pub expiry: Duration,

    /// Encrypt the secret before signing it
    pub encrypt: bool,
}

impl CookieSecretSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cookie.validate()?;
        require_positive("expiry", self.expiry)
    }
}

impl Default for CookieSecretSettings {
    fn default() -> Self {
        Self {
            cookie: CookieSettings::named("OAuth1TokenSecret").with_max_age(Some(FIVE_MINUTES)),
            expiry: FIVE_MINUTES,
            encrypt: true,
        }
    }
}

pub struct CookieSecretProvider {
    settings: CookieSecretSettings,
    signer: Signer,
    crypter: Crypter,
    clock: Arc<dyn Clock>,
}

impl CookieSecretProvider {
    /// Create a token secret provider.
    ///
    /// # Arguments
    /// * `settings` - Cookie attributes, lifetime and whether to encrypt
    /// * `signer` - Signs the cookie value
    /// * `crypter` - Encrypts the secret when `encrypt` is set
    /// * `clock` - Source of the current time for expiry
    ///
    /// # Errors
    /// Any invalid setting.
    pub fn new(
        settings: CookieSecretSettings,
        signer: Signer,
        crypter: Crypter,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings,
            signer,
            crypter,
            clock,
        })
    }

    /// Wrap the secret of a request token.
    pub fn build(&self, info: &OAuth1Info) -> CookieSecret {
        CookieSecret {
            value: info.secret.clone(),
            expires_at: self.clock.now() + to_chrono(self.settings.expiry),
        }
    }

    /// Encode a secret as `sign(encrypt(json))`, or `sign(base64(json))` when
    /// encryption is off.
    ///
    /// # Errors
    /// * `Serialization` - The secret could not be written as JSON
    /// * `Encryption` - The crypter rejected the payload
    pub fn serialize(&self, secret: &CookieSecret) -> Result<String, SecretError> {
        let json =
            serde_json::to_string(secret).map_err(|e| SecretError::Serialization(e.to_string()))?;

        let payload = if self.settings.encrypt {
            self.crypter
                .encrypt(&json)
                .map_err(|e| SecretError::Encryption(e.to_string()))?
        } else {
            URL_SAFE_NO_PAD.encode(json)
        };

        Ok(self.signer.sign(&payload))
    }

    /// Decode a secret cookie value. Expiry is not checked here.
    pub fn unserialize(&self, provider_id: &str, value: &str) -> Result<CookieSecret, SecretError> {
        let provider_id = provider_id.to_string();

        let payload = self.signer.extract(value).map_err(|e| match e {
            SignerError::InvalidSignature => SecretError::InvalidSignature {
                provider_id: provider_id.clone(),
            },
            SignerError::InvalidFormat | SignerError::UnknownVersion(_) => {
                SecretError::InvalidFormat {
                    provider_id: provider_id.clone(),
                }
            }
        })?;

        let json = if self.settings.encrypt {
            self.crypter
                .decrypt(&payload)
                .map_err(|_| SecretError::Decryption {
                    provider_id: provider_id.clone(),
                })?
        } else {
            URL_SAFE_NO_PAD
                .decode(&payload)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .ok_or_else(|| SecretError::InvalidFormat {
                    provider_id: provider_id.clone(),
                })?
        };

        serde_json::from_str(&json).map_err(|e| match e.classify() {
            Category::Data => SecretError::InvalidShape { provider_id },
            Category::Io | Category::Syntax | Category::Eof => {
                SecretError::InvalidJson { provider_id }
            }
        })
    }

    /// Read the secret published by the first leg.
    ///
    /// # Errors
    /// * `Missing` - The request has no secret cookie
    /// * `InvalidSignature`, `InvalidFormat`, `InvalidJson`, `InvalidShape`, `Decryption` - The cookie is unreadable
    /// * `Expired` - The secret outlived its expiry
    pub fn retrieve(
        &self,
        provider_id: &str,
        request: &dyn RequestContext,
    ) -> Result<CookieSecret, SecretError> {
        let value = request
            .cookie(&self.settings.cookie.name)
            .ok_or_else(|| SecretError::Missing {
                provider_id: provider_id.to_string(),
            })?;

        let secret = self.unserialize(provider_id, value)?;
        if secret.is_expired(self.clock.now()) {
            return Err(SecretError::Expired {
                provider_id: provider_id.to_string(),
            });
        }

        Ok(secret)
    }

    pub fn publish(
        &self,
        secret: &CookieSecret,
        response: &mut dyn ResponseContext,
    ) -> Result<(), SecretError> {
        response.set_cookie(self.settings.cookie.build(self.serialize(secret)?));
        Ok(())
    }

    pub fn discard(&self, response: &mut dyn ResponseContext) {
        response.discard_cookie(self.settings.cookie.build(String::new()));
    }
}

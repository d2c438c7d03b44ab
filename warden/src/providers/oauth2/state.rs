//! OAuth2 `state` parameter kept in a signed cookie.
//!
//! The state is generated before redirecting to the provider, published as a
//! cookie, and compared against the `state` query parameter when the
//! provider redirects back.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::error::Category;

use crate::clock::Clock;
use crate::context::CookieSettings;
use crate::context::RequestContext;
use crate::context::ResponseContext;
use crate::crypto::IdGenerator;
use crate::crypto::IdGeneratorError;
use crate::crypto::Signer;
use crate::crypto::SignerError;
use crate::providers::errors::StateError;
use crate::settings::require_positive;
use crate::settings::to_chrono;
use crate::settings::ConfigError;

/// Query parameter the provider echoes the state in.
pub const STATE_PARAM: &str = "state";

const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);

/// Anti-CSRF state of one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieState {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CookieState {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CookieStateSettings {
    pub cookie: CookieSettings,

    #[serde(with = "humantime_serde")]
    pub expiry: Duration,
}

impl CookieStateSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cookie.validate()?;
        require_positive("expiry", self.expiry)
    }
}

impl Default for CookieStateSettings {
    fn default() -> Self {
        Self {
            cookie: CookieSettings::named("OAuth2State").with_max_age(Some(FIVE_MINUTES)),
            expiry: FIVE_MINUTES,
        }
    }
}

pub struct CookieStateProvider {
    settings: CookieStateSettings,
    signer: Signer,
    id_generator: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl CookieStateProvider {
    /// Create a state provider.
    ///
    /// # Arguments
    /// * `settings` - State cookie attributes and lifetime
    /// * `signer` - Signs the cookie value
    /// * `id_generator` - Source of the random state values
    /// * `clock` - Source of the current time for expiry
    ///
    /// # Errors
    /// * `Empty` - The cookie name is blank
    /// * `NonPositiveDuration`, `DurationOutOfRange` - The expiry is unusable
    pub fn new(
        settings: CookieStateSettings,
        signer: Signer,
        id_generator: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings,
            signer,
            id_generator,
            clock,
        })
    }

    /// Generate a fresh state.
    pub fn build(&self) -> Result<CookieState, IdGeneratorError> {
        Ok(CookieState {
            value: self.id_generator.generate()?,
            expires_at: self.clock.now() + to_chrono(self.settings.expiry),
        })
    }

    /// Encode a state as `sign(base64(json))`.
    ///
    /// # Errors
    /// * `Serialization` - The state could not be written as JSON
    pub fn serialize(&self, state: &CookieState) -> Result<String, StateError> {
        let json =
            serde_json::to_vec(state).map_err(|e| StateError::Serialization(e.to_string()))?;
        Ok(self.signer.sign(&URL_SAFE_NO_PAD.encode(json)))
    }

    /// Decode a state cookie value. Expiry is not checked here.
    ///
    /// # Arguments
    /// * `provider_id` - Provider the state belongs to, carried by every error
    /// * `value` - Raw cookie value
    ///
    /// # Errors
    /// * `InvalidSignature` - The value was not signed with this provider's key
    /// * `InvalidFormat` - The value is not a signed Base64 payload
    /// * `InvalidJson` - The payload is not JSON
    /// * `InvalidShape` - The payload is JSON but not a state
    pub fn unserialize(&self, provider_id: &str, value: &str) -> Result<CookieState, StateError> {
        let encoded = self.signer.extract(value).map_err(|e| match e {
            SignerError::InvalidSignature => StateError::InvalidSignature {
                provider_id: provider_id.to_string(),
            },
            SignerError::InvalidFormat | SignerError::UnknownVersion(_) => {
                StateError::InvalidFormat {
                    provider_id: provider_id.to_string(),
                }
            }
        })?;

        let json = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| StateError::InvalidFormat {
                provider_id: provider_id.to_string(),
            })?;

        serde_json::from_slice(&json).map_err(|e| match e.classify() {
            Category::Data => StateError::InvalidShape {
                provider_id: provider_id.to_string(),
            },
            Category::Io | Category::Syntax | Category::Eof => StateError::InvalidJson {
                provider_id: provider_id.to_string(),
            },
        })
    }

    /// Check the state cookie against the `state` query parameter.
    ///
    /// # Errors
    /// * `ClientStateMissing` - The request has no state cookie
    /// * `ProviderStateMissing` - The request has no `state` parameter
    /// * `InvalidSignature`, `InvalidFormat`, `InvalidJson`, `InvalidShape` - The cookie is unreadable
    /// * `Expired` - The state outlived its expiry
    /// * `NotEqual` - The parameter differs from the cookie
    pub fn validate(
        &self,
        provider_id: &str,
        request: &dyn RequestContext,
    ) -> Result<CookieState, StateError> {
        let cookie = request
            .cookie(&self.settings.cookie.name)
            .ok_or_else(|| StateError::ClientStateMissing {
                provider_id: provider_id.to_string(),
            })?;
        let echoed = request
            .query_param(STATE_PARAM)
            .ok_or_else(|| StateError::ProviderStateMissing {
                provider_id: provider_id.to_string(),
            })?;

        let state = self.unserialize(provider_id, cookie)?;

        if state.is_expired(self.clock.now()) {
            return Err(StateError::Expired {
                provider_id: provider_id.to_string(),
            });
        }
        if state.value != echoed {
            return Err(StateError::NotEqual {
                provider_id: provider_id.to_string(),
            });
        }

        Ok(state)
    }

    /// Store the state in its cookie.
    ///
    /// # Errors
    /// * `Serialization` - The state could not be written as JSON
    pub fn publish(
        &self,
        state: &CookieState,
        response: &mut dyn ResponseContext,
    ) -> Result<(), StateError> {
        response.set_cookie(self.settings.cookie.build(self.serialize(state)?));
        Ok(())
    }

    pub fn discard(&self, response: &mut dyn ResponseContext) {
        response.discard_cookie(self.settings.cookie.build(String::new()));
    }
}

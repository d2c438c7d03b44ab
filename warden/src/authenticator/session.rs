use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;

use super::errors::failed;
use super::Authenticator;
use super::AuthenticatorCause;
use super::AuthenticatorDeps;
use super::AuthenticatorError;
use super::AuthenticatorService;
use super::Operation;
use crate::context::RequestContext;
use crate::context::ResponseContext;
use crate::crypto::Crypter;
use crate::login_info::LoginInfo;
use crate::settings::require_non_empty;
use crate::settings::require_optional_positive;
use crate::settings::require_positive;
use crate::settings::to_chrono;
use crate::settings::ConfigError;

const ID: &str = "session-authenticator";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionAuthenticatorSettings {
    /// Session entry holding the serialized authenticator
    pub session_key: String,

    pub use_fingerprinting: bool,

    /// Encrypt the authenticator instead of only encoding it
    pub encrypt_authenticator: bool,

    #[serde(with = "humantime_serde")]
    pub expiry: Duration,

    #[serde(with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
}

impl SessionAuthenticatorSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("session_key", &self.session_key)?;
        require_positive("expiry", self.expiry)?;
        require_optional_positive("idle_timeout", self.idle_timeout)
    }
}

impl Default for SessionAuthenticatorSettings {
    fn default() -> Self {
        Self {
            session_key: "authenticator".to_string(),
            use_fingerprinting: true,
            encrypt_authenticator: true,
            expiry: Duration::from_secs(12 * 60 * 60),
            idle_timeout: Some(Duration::from_secs(30 * 60)),
        }
    }
}

/// Authenticator kept entirely in the client session.
///
/// Nothing is stored server side, so a discarded authenticator stays usable
/// by a client that kept a copy of its session until it expires.
pub struct SessionAuthenticatorService {
    settings: SessionAuthenticatorSettings,
    crypter: Crypter,
    deps: AuthenticatorDeps,
}

impl SessionAuthenticatorService {
    /// Create a session authenticator service.
    ///
    /// # Errors
    /// Any invalid setting.
    pub fn new(
        settings: SessionAuthenticatorSettings,
        crypter: Crypter,
        deps: AuthenticatorDeps,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings,
            crypter,
            deps,
        })
    }

    /// Encode an authenticator for the session.
    pub fn serialize(&self, authenticator: &Authenticator) -> Result<String, AuthenticatorCause> {
        let json = serde_json::to_string(authenticator)
            .map_err(|e| AuthenticatorCause::Serialization(e.to_string()))?;

        if self.settings.encrypt_authenticator {
            Ok(self.crypter.encrypt(&json)?)
        } else {
            Ok(STANDARD.encode(json))
        }
    }

    /// Decode an authenticator read from the session.
    pub fn unserialize(&self, value: &str) -> Result<Authenticator, AuthenticatorCause> {
        let json = if self.settings.encrypt_authenticator {
            self.crypter.decrypt(value)?
        } else {
            let bytes = STANDARD
                .decode(value)
                .map_err(|e| AuthenticatorCause::Serialization(e.to_string()))?;
            String::from_utf8(bytes).map_err(|e| AuthenticatorCause::Serialization(e.to_string()))?
        };

        serde_json::from_str(&json).map_err(|e| AuthenticatorCause::Serialization(e.to_string()))
    }

    fn embed(
        &self,
        authenticator: &Authenticator,
        response: &mut dyn ResponseContext,
        operation: Operation,
    ) -> Result<(), AuthenticatorError> {
        let value = self.serialize(authenticator).map_err(failed(ID, operation))?;
        response.set_session_value(&self.settings.session_key, value);
        Ok(())
    }
}

#[async_trait]
impl AuthenticatorService for SessionAuthenticatorService {
    fn id(&self) -> &'static str {
        ID
    }

    fn now(&self) -> DateTime<Utc> {
        self.deps.clock.now()
    }

    async fn create(
        &self,
        login_info: LoginInfo,
        request: &dyn RequestContext,
    ) -> Result<Authenticator, AuthenticatorError> {
        let id = self
            .deps
            .id_generator
            .generate()
            .map_err(failed(ID, Operation::Create))?;
        let now = self.now();

        let fingerprint = self
            .settings
            .use_fingerprinting
            .then(|| self.deps.fingerprint_generator.generate(request));

        Ok(Authenticator {
            id,
            login_info,
            last_used: now,
            expires_at: now + to_chrono(self.settings.expiry),
            idle_timeout: self.settings.idle_timeout.map(to_chrono),
            fingerprint,
            custom_claims: None,
        })
    }

    async fn retrieve(
        &self,
        request: &dyn RequestContext,
    ) -> Result<Option<Authenticator>, AuthenticatorError> {
        let Some(value) = request.session_value(&self.settings.session_key) else {
            return Ok(None);
        };

        let authenticator = match self.unserialize(value) {
            Ok(authenticator) => authenticator,
            Err(e) => {
                tracing::info!(authenticator = ID, error = %e, "Ignoring unreadable session authenticator");
                return Ok(None);
            }
        };

        if self.settings.use_fingerprinting {
            let fingerprint = self.deps.fingerprint_generator.generate(request);
            if authenticator.fingerprint.as_deref() != Some(fingerprint.as_str()) {
                tracing::info!(
                    authenticator = ID,
                    login = %authenticator.login_info,
                    "Fingerprint does not match, ignoring authenticator"
                );
                return Ok(None);
            }
        }

        Ok(Some(authenticator))
    }

    async fn init(
        &self,
        authenticator: Authenticator,
        response: &mut dyn ResponseContext,
    ) -> Result<(), AuthenticatorError> {
        self.embed(&authenticator, response, Operation::Init)
    }

    async fn update(
        &self,
        authenticator: Authenticator,
        response: &mut dyn ResponseContext,
    ) -> Result<(), AuthenticatorError> {
        self.embed(&authenticator, response, Operation::Update)
    }

    async fn renew(
        &self,
        authenticator: Authenticator,
        request: &dyn RequestContext,
        response: &mut dyn ResponseContext,
    ) -> Result<Authenticator, AuthenticatorError> {
        let renewed = self
            .create(authenticator.login_info, request)
            .await
            .map_err(|e| AuthenticatorError::new(ID, Operation::Renew, e.cause))?;

        self.embed(&renewed, response, Operation::Renew)?;
        Ok(renewed)
    }

    async fn discard(
        &self,
        _authenticator: &Authenticator,
        response: &mut dyn ResponseContext,
    ) -> Result<(), AuthenticatorError> {
        response.remove_session_value(&self.settings.session_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::authenticator::tests::authenticator;
    use crate::clock::FixedClock;
    use crate::context::HttpRequestContext;
    use crate::context::HttpResponseContext;
    use crate::crypto::CrypterSettings;

    fn crypter() -> Crypter {
        Crypter::new(CrypterSettings::new("session-crypter-key-0123")).unwrap()
    }

    fn service(settings: SessionAuthenticatorSettings) -> SessionAuthenticatorService {
        let deps = AuthenticatorDeps::default().with_clock(Arc::new(FixedClock::new(Utc::now())));
        SessionAuthenticatorService::new(settings, crypter(), deps).unwrap()
    }

    fn browser() -> HttpRequestContext {
        HttpRequestContext::default().with_header("User-Agent", "Firefox")
    }

    /// Carry the session written by `response` into a follow-up request.
    fn next_request(response: &HttpResponseContext, base: HttpRequestContext) -> HttpRequestContext {
        match response.session_value("authenticator") {
            Some(value) => base.with_session_value("authenticator", value),
            None => base,
        }
    }

    #[tokio::test]
    async fn test_init_then_retrieve() {
        let service = service(SessionAuthenticatorSettings::default());
        let created = service
            .create(LoginInfo::new("credentials", "alice@example.com"), &browser())
            .await
            .unwrap();

        let mut response = HttpResponseContext::default();
        service.init(created.clone(), &mut response).await.unwrap();

        let stored = response.session_value("authenticator").unwrap();
        assert!(!stored.contains("alice"));

        let request = next_request(&response, browser());
        assert_eq!(service.retrieve(&request).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_plain_encoding_when_encryption_disabled() {
        let service = service(SessionAuthenticatorSettings {
            encrypt_authenticator: false,
            use_fingerprinting: false,
            ..SessionAuthenticatorSettings::default()
        });
        let a = authenticator(Utc::now(), None);

        let value = service.serialize(&a).unwrap();
        let json = STANDARD.decode(&value).unwrap();

        assert_eq!(serde_json::from_slice::<Authenticator>(&json).unwrap(), a);
        assert_eq!(service.unserialize(&value).unwrap(), a);
    }

    #[tokio::test]
    async fn test_unreadable_session_value_is_ignored() {
        let service = service(SessionAuthenticatorSettings::default());
        let request = browser().with_session_value("authenticator", "1-garbage");

        assert_eq!(service.retrieve(&request).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_other_client_is_ignored() {
        let service = service(SessionAuthenticatorSettings::default());
        let created = service
            .create(LoginInfo::new("credentials", "alice@example.com"), &browser())
            .await
            .unwrap();
        let mut response = HttpResponseContext::default();
        service.init(created, &mut response).await.unwrap();

        let other = HttpRequestContext::default().with_header("User-Agent", "curl/8.0");
        let request = next_request(&response, other);

        assert_eq!(service.retrieve(&request).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_discard_removes_session_entry() {
        let service = service(SessionAuthenticatorSettings::default());
        let request = browser().with_session_value("authenticator", "value");
        let mut response = HttpResponseContext::for_request(&request);

        service
            .discard(&authenticator(Utc::now(), None), &mut response)
            .await
            .unwrap();

        assert_eq!(response.session_value("authenticator"), None);
        assert!(!response.is_unmodified());
    }

    #[tokio::test]
    async fn test_renew_issues_new_id() {
        let service = service(SessionAuthenticatorSettings::default());
        let created = service
            .create(LoginInfo::new("credentials", "alice@example.com"), &browser())
            .await
            .unwrap();

        let mut response = HttpResponseContext::default();
        let renewed = service
            .renew(created.clone(), &browser(), &mut response)
            .await
            .unwrap();

        assert_ne!(renewed.id, created.id);
        assert_eq!(renewed.login_info, created.login_info);
        let request = next_request(&response, browser());
        assert_eq!(service.retrieve(&request).await.unwrap(), Some(renewed));
    }
}

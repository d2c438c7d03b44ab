use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::DateTime;
use chrono::SubsecRound;
use chrono::Utc;
use serde::Deserialize;

use super::bearer::read_token;
use super::bearer::DEFAULT_HEADER_NAME;
use super::errors::failed;
use super::Authenticator;
use super::AuthenticatorCause;
use super::AuthenticatorDeps;
use super::AuthenticatorError;
use super::AuthenticatorRepository;
use super::AuthenticatorService;
use super::Operation;
use crate::context::RequestContext;
use crate::context::ResponseContext;
use crate::crypto::Crypter;
use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::login_info::LoginInfo;
use crate::settings::require_non_empty;
use crate::settings::require_optional_positive;
use crate::settings::require_positive;
use crate::settings::require_secret;
use crate::settings::to_chrono;
use crate::settings::ConfigError;

const ID: &str = "jwt-authenticator";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtAuthenticatorSettings {
    pub header_name: String,

    /// Value of the `iss` claim, checked on every token
    pub issuer_claim: String,

    /// Encrypt the login info in `sub` instead of only encoding it
    pub encrypt_subject: bool,

    #[serde(with = "humantime_serde")]
    pub expiry: Duration,

    #[serde(with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,

    /// HMAC key the tokens are signed with
    pub shared_secret: String,
}

impl JwtAuthenticatorSettings {
    pub const MIN_SECRET_LENGTH: usize = 32;

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("header_name", &self.header_name)?;
        require_non_empty("issuer_claim", &self.issuer_claim)?;
        require_positive("expiry", self.expiry)?;
        require_optional_positive("idle_timeout", self.idle_timeout)?;
        require_secret("shared_secret", &self.shared_secret, Self::MIN_SECRET_LENGTH)
    }
}

impl Default for JwtAuthenticatorSettings {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_HEADER_NAME.to_string(),
            issuer_claim: "play-silhouette".to_string(),
            encrypt_subject: true,
            expiry: Duration::from_secs(12 * 60 * 60),
            idle_timeout: None,
            shared_secret: String::new(),
        }
    }
}

/// Authenticator carried as a signed JWT in a request header.
///
/// Without a repository the token is self-contained and cannot be revoked
/// before it expires. With one, every token must also be present in the
/// store, so discarding it takes effect immediately.
pub struct JwtAuthenticatorService {
    settings: JwtAuthenticatorSettings,
    handler: JwtHandler,
    crypter: Crypter,
    repository: Option<Arc<dyn AuthenticatorRepository>>,
    deps: AuthenticatorDeps,
}

impl JwtAuthenticatorService {
    /// Create a JWT authenticator service.
    ///
    /// # Arguments
    /// * `settings` - Header name, issuer, lifetimes and signing secret
    /// * `crypter` - Encrypts the subject when `encrypt_subject` is set
    /// * `repository` - Optional store that makes tokens revocable
    /// * `deps` - Clock, id and fingerprint generators
    ///
    /// # Returns
    /// A service whose tokens are signed with HS256
    ///
    /// # Errors
    /// * `Empty` - The header name or issuer is blank
    /// * `NonPositiveDuration`, `DurationOutOfRange` - A lifetime is unusable
    /// * `SecretTooShort` - The shared secret is under 32 bytes
    pub fn new(
        settings: JwtAuthenticatorSettings,
        crypter: Crypter,
        repository: Option<Arc<dyn AuthenticatorRepository>>,
        deps: AuthenticatorDeps,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let handler = JwtHandler::new(settings.shared_secret.as_bytes())
            .with_issuer(settings.issuer_claim.clone());

        Ok(Self {
            settings,
            handler,
            crypter,
            repository,
            deps,
        })
    }

    /// Header the token travels in.
    pub fn header_name(&self) -> &str {
        &self.settings.header_name
    }

    /// Encode an authenticator as a signed token.
    ///
    /// `iat` carries `last_used` and `exp` carries `expires_at`, both in
    /// whole seconds.
    ///
    /// # Errors
    /// * `ReservedClaim` - A custom claim reuses a registered claim name
    pub fn serialize(&self, authenticator: &Authenticator) -> Result<String, AuthenticatorCause> {
        let login_info = serde_json::to_string(&authenticator.login_info)
            .map_err(|e| AuthenticatorCause::Serialization(e.to_string()))?;
        let subject = if self.settings.encrypt_subject {
            self.crypter.encrypt(&login_info)?
        } else {
            STANDARD.encode(login_info)
        };

        let claims = Claims::new()
            .with_id(&authenticator.id)
            .with_issuer(&self.settings.issuer_claim)
            .with_subject(subject)
            .with_issued_at(authenticator.last_used.timestamp())
            .with_expiration(authenticator.expires_at.timestamp())
            .with_extra(authenticator.custom_claims.clone().unwrap_or_default());

        if let Some(reserved) = claims.reserved_collision() {
            return Err(JwtError::ReservedClaim(reserved.to_string()).into());
        }

        Ok(self.handler.encode(&claims)?)
    }

    /// Decode and verify a token.
    ///
    /// # Errors
    /// * `InvalidSignature` - The token was altered or signed with another key
    /// * `InvalidIssuer` - `iss` differs from the configured issuer
    /// * `InvalidSubject` - `sub` does not decode to a login info
    /// * `MissingClaim` - A registered claim the authenticator needs is absent
    /// * `DecodingFailed` - The token is malformed
    pub fn unserialize(&self, token: &str) -> Result<Authenticator, JwtError> {
        let claims: Claims = self.handler.decode(token)?;

        let id = claims.jti.ok_or_else(|| missing("jti"))?;
        let subject = claims.sub.ok_or_else(|| missing("sub"))?;
        let issued_at = claims.iat.ok_or_else(|| missing("iat"))?;
        let expiration = claims.exp.ok_or_else(|| missing("exp"))?;

        let login_info = self.decode_subject(&subject)?;

        Ok(Authenticator {
            id,
            login_info,
            last_used: timestamp("iat", issued_at)?,
            expires_at: timestamp("exp", expiration)?,
            idle_timeout: self.settings.idle_timeout.map(to_chrono),
            fingerprint: None,
            custom_claims: (!claims.extra.is_empty()).then_some(claims.extra),
        })
    }

    fn decode_subject(&self, subject: &str) -> Result<LoginInfo, JwtError> {
        let json = if self.settings.encrypt_subject {
            self.crypter
                .decrypt(subject)
                .map_err(|e| JwtError::InvalidSubject(e.to_string()))?
        } else {
            let bytes = STANDARD
                .decode(subject)
                .map_err(|e| JwtError::InvalidSubject(e.to_string()))?;
            String::from_utf8(bytes).map_err(|e| JwtError::InvalidSubject(e.to_string()))?
        };

        serde_json::from_str(&json).map_err(|e| JwtError::InvalidSubject(e.to_string()))
    }

    fn embed(
        &self,
        authenticator: &Authenticator,
        response: &mut dyn ResponseContext,
        operation: Operation,
    ) -> Result<(), AuthenticatorError> {
        let token = self.serialize(authenticator).map_err(failed(ID, operation))?;
        response.set_header(&self.settings.header_name, token);
        Ok(())
    }
}

fn missing(claim: &str) -> JwtError {
    JwtError::MissingClaim(claim.to_string())
}

fn timestamp(claim: &str, seconds: i64) -> Result<DateTime<Utc>, JwtError> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| JwtError::DecodingFailed(format!("`{}` is out of range", claim)))
}

#[async_trait]
impl AuthenticatorService for JwtAuthenticatorService {
    fn id(&self) -> &'static str {
        ID
    }

    fn now(&self) -> DateTime<Utc> {
        self.deps.clock.now()
    }

    async fn create(
        &self,
        login_info: LoginInfo,
        _request: &dyn RequestContext,
    ) -> Result<Authenticator, AuthenticatorError> {
        let id = self
            .deps
            .id_generator
            .generate()
            .map_err(failed(ID, Operation::Create))?;
        let now = self.now().trunc_subsecs(0);

        Ok(Authenticator {
            id,
            login_info,
            last_used: now,
            expires_at: now + to_chrono(self.settings.expiry),
            idle_timeout: self.settings.idle_timeout.map(to_chrono),
            fingerprint: None,
            custom_claims: None,
        })
    }

    async fn retrieve(
        &self,
        request: &dyn RequestContext,
    ) -> Result<Option<Authenticator>, AuthenticatorError> {
        let Some(token) = read_token(request, &self.settings.header_name) else {
            return Ok(None);
        };

        let authenticator = match self.unserialize(&token) {
            Ok(authenticator) => authenticator,
            Err(e) => {
                tracing::info!(authenticator = ID, error = %e, "Ignoring invalid token");
                return Ok(None);
            }
        };

        let Some(repository) = &self.repository else {
            return Ok(Some(authenticator));
        };

        let stored = repository
            .find(&authenticator.id)
            .await
            .map_err(failed(ID, Operation::Retrieve))?;
        if stored.is_none() {
            tracing::debug!(authenticator = ID, login = %authenticator.login_info, "Token is no longer stored");
        }
        Ok(stored)
    }

    async fn init(
        &self,
        authenticator: Authenticator,
        response: &mut dyn ResponseContext,
    ) -> Result<(), AuthenticatorError> {
        let token = self
            .serialize(&authenticator)
            .map_err(failed(ID, Operation::Init))?;

        if let Some(repository) = &self.repository {
            if let Err(e) = repository.add(authenticator).await {
                tracing::warn!(
                    authenticator = ID,
                    error = %e,
                    "Could not store authenticator, response left unchanged"
                );
                return Ok(());
            }
        }

        response.set_header(&self.settings.header_name, token);
        Ok(())
    }

    async fn update(
        &self,
        authenticator: Authenticator,
        response: &mut dyn ResponseContext,
    ) -> Result<(), AuthenticatorError> {
        let authenticator = match &self.repository {
            Some(repository) => repository
                .update(authenticator)
                .await
                .map_err(failed(ID, Operation::Update))?,
            None => authenticator,
        };

        self.embed(&authenticator, response, Operation::Update)
    }

    async fn renew(
        &self,
        authenticator: Authenticator,
        request: &dyn RequestContext,
        response: &mut dyn ResponseContext,
    ) -> Result<Authenticator, AuthenticatorError> {
        if let Some(repository) = &self.repository {
            repository
                .remove(&authenticator.id)
                .await
                .map_err(failed(ID, Operation::Renew))?;
        }

        let mut renewed = self
            .create(authenticator.login_info, request)
            .await
            .map_err(|e| AuthenticatorError::new(ID, Operation::Renew, e.cause))?;
        renewed.custom_claims = authenticator.custom_claims;

        self.init(renewed.clone(), response).await?;
        Ok(renewed)
    }

    async fn discard(
        &self,
        authenticator: &Authenticator,
        _response: &mut dyn ResponseContext,
    ) -> Result<(), AuthenticatorError> {
        if let Some(repository) = &self.repository {
            repository
                .remove(&authenticator.id)
                .await
                .map_err(failed(ID, Operation::Discard))?;
        }
        Ok(())
    }
}

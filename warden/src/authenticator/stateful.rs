//! Authenticators that carry only an id and keep state in a repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use super::errors::failed;
use super::AuthenticatorDeps;
use super::AuthenticatorRepository;
use super::Authenticator;
use super::AuthenticatorError;
use super::AuthenticatorService;
use super::Operation;
use crate::context::RequestContext;
use crate::context::ResponseContext;
use crate::login_info::LoginInfo;

/// Moves an authenticator id between client and server.
pub trait IdCarrier: Send + Sync + 'static {
    /// Identifier of the authenticator built on this carrier.
    const ID: &'static str;

    fn read(&self, request: &dyn RequestContext) -> Option<String>;

    fn embed(&self, id: &str, response: &mut dyn ResponseContext);

    /// Tell the client to stop sending the id.
    fn strip(&self, response: &mut dyn ResponseContext);
}

/// Lifecycle parameters of a stateful authenticator.
#[derive(Debug, Clone, Copy)]
pub struct Lifetime {
    pub expiry: Duration,
    pub idle_timeout: Option<Duration>,
    pub use_fingerprinting: bool,
}

/// [`AuthenticatorService`] over an id carrier and an [`AuthenticatorRepository`].
pub struct StatefulAuthenticatorService<C: IdCarrier> {
    carrier: C,
    lifetime: Lifetime,
    repository: Arc<dyn AuthenticatorRepository>,
    deps: AuthenticatorDeps,
}

impl<C: IdCarrier> StatefulAuthenticatorService<C> {
    pub(crate) fn from_parts(
        carrier: C,
        lifetime: Lifetime,
        repository: Arc<dyn AuthenticatorRepository>,
        deps: AuthenticatorDeps,
    ) -> Self {
        Self {
            carrier,
            lifetime,
            repository,
            deps,
        }
    }

    pub fn carrier(&self) -> &C {
        &self.carrier
    }
}

#[async_trait]
impl<C: IdCarrier> AuthenticatorService for StatefulAuthenticatorService<C> {
    fn id(&self) -> &'static str {
        C::ID
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
            .map_err(failed(C::ID, Operation::Create))?;
        let now = self.now();

        let fingerprint = self
            .lifetime
            .use_fingerprinting
            .then(|| self.deps.fingerprint_generator.generate(request));

        Ok(Authenticator {
            id,
            login_info,
            last_used: now,
            expires_at: now + self.lifetime.expiry,
            idle_timeout: self.lifetime.idle_timeout,
            fingerprint,
            custom_claims: None,
        })
    }

    async fn retrieve(
        &self,
        request: &dyn RequestContext,
    ) -> Result<Option<Authenticator>, AuthenticatorError> {
        let Some(id) = self.carrier.read(request) else {
            return Ok(None);
        };

        let found = self
            .repository
            .find(&id)
            .await
            .map_err(failed(C::ID, Operation::Retrieve))?;

        let Some(authenticator) = found else {
            tracing::debug!(authenticator = C::ID, "No stored authenticator for carried id");
            return Ok(None);
        };

        if self.lifetime.use_fingerprinting {
            let fingerprint = self.deps.fingerprint_generator.generate(request);
            if authenticator.fingerprint.as_deref() != Some(fingerprint.as_str()) {
                tracing::info!(
                    authenticator = C::ID,
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
        match self.repository.add(authenticator).await {
            Ok(stored) => {
                self.carrier.embed(&stored.id, response);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    authenticator = C::ID,
                    error = %e,
                    "Could not store authenticator, response left unchanged"
                );
                Ok(())
            }
        }
    }

    async fn update(
        &self,
        authenticator: Authenticator,
        _response: &mut dyn ResponseContext,
    ) -> Result<(), AuthenticatorError> {
        self.repository
            .update(authenticator)
            .await
            .map_err(failed(C::ID, Operation::Update))?;
        Ok(())
    }

    async fn renew(
        &self,
        authenticator: Authenticator,
        request: &dyn RequestContext,
        response: &mut dyn ResponseContext,
    ) -> Result<Authenticator, AuthenticatorError> {
        self.repository
            .remove(&authenticator.id)
            .await
            .map_err(failed(C::ID, Operation::Renew))?;

        let renewed = self
            .create(authenticator.login_info, request)
            .await
            .map_err(|e| AuthenticatorError::new(C::ID, Operation::Renew, e.cause))?;

        self.init(renewed.clone(), response).await?;
        Ok(renewed)
    }

    async fn discard(
        &self,
        authenticator: &Authenticator,
        response: &mut dyn ResponseContext,
    ) -> Result<(), AuthenticatorError> {
        self.repository
            .remove(&authenticator.id)
            .await
            .map_err(failed(C::ID, Operation::Discard))?;

        self.carrier.strip(response);
        Ok(())
    }
}

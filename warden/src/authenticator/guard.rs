use std::sync::Arc;

use super::Authenticator;
use super::AuthenticatorError;
use super::AuthenticatorService;
use super::Touched;
use crate::context::RequestContext;
use crate::context::ResponseContext;

/// A valid authenticator attached to the current request.
#[derive(Debug, Clone, PartialEq)]
pub struct Authenticated {
    pub authenticator: Authenticator,
    touched: bool,
}

impl Authenticated {
    /// True when `last_used` moved and the authenticator must be persisted.
    pub fn is_touched(&self) -> bool {
        self.touched
    }
}

impl From<Touched> for Authenticated {
    fn from(touched: Touched) -> Self {
        let is_touched = touched.is_touched();
        Self {
            authenticator: touched.into_inner(),
            touched: is_touched,
        }
    }
}

/// Per-request driver around an [`AuthenticatorService`].
///
/// `authenticate` runs before the handler, `finish` after it.
pub struct AuthenticationGuard<S: AuthenticatorService + ?Sized> {
    service: Arc<S>,
}

impl<S: AuthenticatorService + ?Sized> Clone for AuthenticationGuard<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<S: AuthenticatorService + ?Sized> AuthenticationGuard<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Retrieve the request's authenticator and check it.
    ///
    /// An expired or timed out authenticator is discarded and reads as `None`.
    /// A valid one is touched.
    pub async fn authenticate(
        &self,
        request: &dyn RequestContext,
        response: &mut dyn ResponseContext,
    ) -> Result<Option<Authenticated>, AuthenticatorError> {
        let Some(authenticator) = self.service.retrieve(request).await? else {
            return Ok(None);
        };

        let now = self.service.now();
        if !authenticator.is_valid(now) {
            tracing::info!(
                authenticator = self.service.id(),
                login = %authenticator.login_info,
                expired = authenticator.is_expired(now),
                "Discarding invalid authenticator"
            );
            self.service.discard(&authenticator, response).await?;
            return Ok(None);
        }

        Ok(Some(self.service.touch(authenticator).into()))
    }

    /// Persist the authenticator if `authenticate` touched it.
    pub async fn finish(
        &self,
        authenticated: Authenticated,
        response: &mut dyn ResponseContext,
    ) -> Result<(), AuthenticatorError> {
        if authenticated.touched {
            self.service
                .update(authenticated.authenticator, response)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use chrono::Utc;
    use mockall::predicate::eq;

    use super::*;
    use crate::authenticator::repository::MockAuthenticatorRepository;
    use crate::authenticator::tests::authenticator;
    use crate::authenticator::AuthenticatorDeps;
    use crate::authenticator::BearerTokenAuthenticatorService;
    use crate::authenticator::BearerTokenAuthenticatorSettings;
    use crate::clock::FixedClock;
    use crate::context::HttpRequestContext;
    use crate::context::HttpResponseContext;

    fn guard(
        repository: MockAuthenticatorRepository,
        clock: Arc<FixedClock>,
    ) -> AuthenticationGuard<BearerTokenAuthenticatorService> {
        let service = BearerTokenAuthenticatorService::new(
            BearerTokenAuthenticatorSettings::default(),
            Arc::new(repository),
            AuthenticatorDeps::default().with_clock(clock),
        )
        .unwrap();
        AuthenticationGuard::new(Arc::new(service))
    }

    fn request() -> HttpRequestContext {
        HttpRequestContext::default().with_header("X-Auth-Token", "id")
    }

    #[tokio::test]
    async fn test_valid_authenticator_is_touched_and_updated() {
        let start = Utc::now();
        let clock = Arc::new(FixedClock::new(start));
        let stored = authenticator(start, Some(Duration::minutes(30)));
        let later = start + Duration::minutes(10);

        let mut expected = stored.clone();
        expected.last_used = later;

        let mut repository = MockAuthenticatorRepository::new();
        repository
            .expect_find()
            .returning(move |_| Ok(Some(stored.clone())));
        repository
            .expect_update()
            .with(eq(expected.clone()))
            .times(1)
            .returning(|a| Ok(a));
        let guard = guard(repository, clock.clone());

        clock.set(later);
        let mut response = HttpResponseContext::default();
        let authenticated = guard
            .authenticate(&request(), &mut response)
            .await
            .unwrap()
            .unwrap();

        assert!(authenticated.is_touched());
        assert_eq!(authenticated.authenticator, expected);

        guard.finish(authenticated, &mut response).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_authenticator_is_discarded() {
        let start = Utc::now();
        let clock = Arc::new(FixedClock::new(start + Duration::hours(12)));
        let stored = authenticator(start, None);

        let mut repository = MockAuthenticatorRepository::new();
        repository
            .expect_find()
            .returning(move |_| Ok(Some(stored.clone())));
        repository
            .expect_remove()
            .with(eq("id"))
            .times(1)
            .returning(|_| Ok(()));
        let guard = guard(repository, clock);

        let mut response = HttpResponseContext::default();
        let authenticated = guard.authenticate(&request(), &mut response).await.unwrap();

        assert_eq!(authenticated, None);
    }

    #[tokio::test]
    async fn test_untouched_authenticator_is_not_updated() {
        let start = Utc::now();
        let clock = Arc::new(FixedClock::new(start));
        let stored = authenticator(start, None);

        let mut repository = MockAuthenticatorRepository::new();
        repository
            .expect_find()
            .returning(move |_| Ok(Some(stored.clone())));
        repository.expect_update().never();
        let guard = guard(repository, clock);

        let mut response = HttpResponseContext::default();
        let authenticated = guard
            .authenticate(&request(), &mut response)
            .await
            .unwrap()
            .unwrap();

        assert!(!authenticated.is_touched());
        guard.finish(authenticated, &mut response).await.unwrap();
    }
}

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::stateful::IdCarrier;
use super::stateful::Lifetime;
use super::stateful::StatefulAuthenticatorService;
use super::AuthenticatorDeps;
use super::AuthenticatorRepository;
use crate::context::RequestContext;
use crate::context::ResponseContext;
use crate::settings::require_non_empty;
use crate::settings::require_optional_positive;
use crate::settings::require_positive;
use crate::settings::to_chrono;
use crate::settings::ConfigError;

pub const DEFAULT_HEADER_NAME: &str = "X-Auth-Token";

const BEARER_SCHEME: &str = "Bearer";

/// Read a token from `header_name`, tolerating a `Bearer` scheme in any case.
pub(crate) fn read_token(request: &dyn RequestContext, header_name: &str) -> Option<String> {
    let value = request.header(header_name)?.trim_start();
    let token = strip_scheme(value).unwrap_or(value).trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// The part after a leading `Bearer` scheme, if the value starts with one.
fn strip_scheme(value: &str) -> Option<&str> {
    let scheme = value.get(..BEARER_SCHEME.len())?;
    let rest = value.get(BEARER_SCHEME.len()..)?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return None;
    }

    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        Some(_) => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BearerTokenAuthenticatorSettings {
    pub header_name: String,

    #[serde(with = "humantime_serde")]
    pub expiry: Duration,

    #[serde(with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
}

impl BearerTokenAuthenticatorSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("header_name", &self.header_name)?;
        require_positive("expiry", self.expiry)?;
        require_optional_positive("idle_timeout", self.idle_timeout)
    }
}

impl Default for BearerTokenAuthenticatorSettings {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_HEADER_NAME.to_string(),
            expiry: Duration::from_secs(12 * 60 * 60),
            idle_timeout: Some(Duration::from_secs(30 * 60)),
        }
    }
}

/// Carries the authenticator id in a request header.
///
/// Headers cannot be withdrawn from a client, so discarding relies on the
/// repository entry being removed.
#[derive(Debug, Clone)]
pub struct HeaderCarrier {
    header_name: String,
}

impl IdCarrier for HeaderCarrier {
    const ID: &'static str = "bearer-token-authenticator";

    fn read(&self, request: &dyn RequestContext) -> Option<String> {
        read_token(request, &self.header_name)
    }

    fn embed(&self, id: &str, response: &mut dyn ResponseContext) {
        response.set_header(&self.header_name, id.to_string());
    }

    fn strip(&self, _response: &mut dyn ResponseContext) {}
}

/// Authenticator whose id travels in a request header.
pub type BearerTokenAuthenticatorService = StatefulAuthenticatorService<HeaderCarrier>;

impl StatefulAuthenticatorService<HeaderCarrier> {
    pub fn new(
        settings: BearerTokenAuthenticatorSettings,
        repository: Arc<dyn AuthenticatorRepository>,
        deps: AuthenticatorDeps,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let lifetime = Lifetime {
            expiry: to_chrono(settings.expiry),
            idle_timeout: settings.idle_timeout.map(to_chrono),
            use_fingerprinting: false,
        };
        let carrier = HeaderCarrier {
            header_name: settings.header_name,
        };

        Ok(Self::from_parts(carrier, lifetime, repository, deps))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::authenticator::repository::InMemoryCache;
    use crate::authenticator::CacheAuthenticatorRepository;
    use crate::authenticator::AuthenticationGuard;
    use crate::authenticator::AuthenticatorService;
    use crate::clock::FixedClock;
    use crate::context::HttpRequestContext;
    use crate::context::HttpResponseContext;
    use crate::login_info::LoginInfo;

    fn service(clock: Arc<FixedClock>) -> BearerTokenAuthenticatorService {
        let repository = CacheAuthenticatorRepository::new(Arc::new(InMemoryCache::new()), clock.clone());
        BearerTokenAuthenticatorService::new(
            BearerTokenAuthenticatorSettings::default(),
            Arc::new(repository),
            AuthenticatorDeps::default().with_clock(clock),
        )
        .unwrap()
    }

    #[test]
    fn test_read_token_strips_bearer_prefix() {
        let plain = HttpRequestContext::default().with_header("X-Auth-Token", "abc");
        let prefixed = HttpRequestContext::default().with_header("X-Auth-Token", "Bearer abc");
        let blank = HttpRequestContext::default().with_header("X-Auth-Token", "Bearer ");
        let scheme_only = HttpRequestContext::default().with_header("X-Auth-Token", " Bearer");
        let lowercase = HttpRequestContext::default().with_header("X-Auth-Token", "bearer  abc ");
        let glued = HttpRequestContext::default().with_header("X-Auth-Token", "Bearerabc");

        assert_eq!(read_token(&plain, "X-Auth-Token"), Some("abc".to_string()));
        assert_eq!(read_token(&prefixed, "x-auth-token"), Some("abc".to_string()));
        assert_eq!(read_token(&blank, "X-Auth-Token"), None);
        assert_eq!(read_token(&scheme_only, "X-Auth-Token"), None);
        assert_eq!(read_token(&lowercase, "X-Auth-Token"), Some("abc".to_string()));
        assert_eq!(read_token(&glued, "X-Auth-Token"), Some("Bearerabc".to_string()));
        assert_eq!(read_token(&HttpRequestContext::default(), "X-Auth-Token"), None);
    }

    #[tokio::test]
    async fn test_header_round_trip() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let service = service(clock);

        let created = service
            .create(LoginInfo::new("credentials", "bob@example.com"), &HttpRequestContext::default())
            .await
            .unwrap();
        assert_eq!(created.fingerprint, None);

        let mut response = HttpResponseContext::default();
        service.init(created.clone(), &mut response).await.unwrap();
        let token = response.header("X-Auth-Token").unwrap().to_string();
        assert_eq!(token, created.id);

        let request = HttpRequestContext::default().with_header("X-Auth-Token", format!("Bearer {}", token));
        assert_eq!(service.retrieve(&request).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_discarded_token_no_longer_retrieved() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let service = service(clock);

        let created = service
            .create(LoginInfo::new("credentials", "bob@example.com"), &HttpRequestContext::default())
            .await
            .unwrap();
        let mut response = HttpResponseContext::default();
        service.init(created.clone(), &mut response).await.unwrap();

        let mut discard_response = HttpResponseContext::default();
        service.discard(&created, &mut discard_response).await.unwrap();
        assert!(discard_response.is_unmodified());

        let request = HttpRequestContext::default().with_header("X-Auth-Token", created.id.clone());
        assert_eq!(service.retrieve(&request).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_idle_token_rejected_by_guard() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let service = Arc::new(service(clock.clone()));
        let guard = AuthenticationGuard::new(service.clone());

        let created = service
            .create(LoginInfo::new("credentials", "bob@example.com"), &HttpRequestContext::default())
            .await
            .unwrap();
        let mut response = HttpResponseContext::default();
        service.init(created.clone(), &mut response).await.unwrap();
        let request = HttpRequestContext::default().with_header("X-Auth-Token", created.id.clone());

        clock.advance(chrono::Duration::minutes(29));
        let mut response = HttpResponseContext::default();
        let authenticated = guard.authenticate(&request, &mut response).await.unwrap();
        assert!(authenticated.is_some());

        clock.advance(chrono::Duration::minutes(31));
        let mut response = HttpResponseContext::default();
        assert!(guard.authenticate(&request, &mut response).await.unwrap().is_none());
    }
}

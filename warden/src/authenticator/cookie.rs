use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::stateful::IdCarrier;
use super::stateful::Lifetime;
use super::stateful::StatefulAuthenticatorService;
use super::AuthenticatorDeps;
use super::AuthenticatorRepository;
use crate::context::CookieSettings;
use crate::context::RequestContext;
use crate::context::ResponseContext;
use crate::settings::require_optional_positive;
use crate::settings::require_positive;
use crate::settings::to_chrono;
use crate::settings::ConfigError;

const TWELVE_HOURS: Duration = Duration::from_secs(12 * 60 * 60);
const THIRTY_MINUTES: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CookieAuthenticatorSettings {
    pub cookie: CookieSettings,

    /// Bind authenticators to the client fingerprint
    pub use_fingerprinting: bool,

    #[serde(with = "humantime_serde")]
    pub expiry: Duration,

    #[serde(with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
}

impl CookieAuthenticatorSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cookie.validate()?;
        require_positive("expiry", self.expiry)?;
        require_optional_positive("idle_timeout", self.idle_timeout)
    }
}

impl Default for CookieAuthenticatorSettings {
    fn default() -> Self {
        Self {
            cookie: CookieSettings::named("authenticator").with_max_age(Some(TWELVE_HOURS)),
            use_fingerprinting: true,
            expiry: TWELVE_HOURS,
            idle_timeout: Some(THIRTY_MINUTES),
        }
    }
}

/// Carries the authenticator id in a cookie.
#[derive(Debug, Clone)]
pub struct CookieCarrier {
    settings: CookieSettings,
}

impl IdCarrier for CookieCarrier {
    const ID: &'static str = "cookie-authenticator";

    fn read(&self, request: &dyn RequestContext) -> Option<String> {
        request
            .cookie(&self.settings.name)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn embed(&self, id: &str, response: &mut dyn ResponseContext) {
        response.set_cookie(self.settings.build(id.to_string()));
    }

    fn strip(&self, response: &mut dyn ResponseContext) {
        response.discard_cookie(self.settings.build(String::new()));
    }
}

/// Authenticator whose id travels in a cookie.
pub type CookieAuthenticatorService = StatefulAuthenticatorService<CookieCarrier>;

impl StatefulAuthenticatorService<CookieCarrier> {
    pub fn new(
        settings: CookieAuthenticatorSettings,
        repository: Arc<dyn AuthenticatorRepository>,
        deps: AuthenticatorDeps,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let lifetime = Lifetime {
            expiry: to_chrono(settings.expiry),
            idle_timeout: settings.idle_timeout.map(to_chrono),
            use_fingerprinting: settings.use_fingerprinting,
        };
        let carrier = CookieCarrier {
            settings: settings.cookie,
        };

        Ok(Self::from_parts(carrier, lifetime, repository, deps))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::predicate::eq;

    use super::*;
    use crate::authenticator::errors::RepositoryError;
    use crate::authenticator::repository::MockAuthenticatorRepository;
    use crate::authenticator::CacheAuthenticatorRepository;
    use crate::authenticator::InMemoryCache;
    use crate::authenticator::tests::authenticator;
    use crate::authenticator::AuthenticatorService;
    use crate::authenticator::Operation;
    use crate::clock::FixedClock;
    use crate::context::HttpRequestContext;
    use crate::context::HttpResponseContext;
    use crate::crypto::IdGeneratorError;
    use crate::crypto::MockIdGenerator;
    use crate::login_info::LoginInfo;

    fn id_generator(id: &'static str) -> Arc<MockIdGenerator> {
        let mut generator = MockIdGenerator::new();
        generator
            .expect_generate()
            .returning(move || Ok(id.to_string()));
        Arc::new(generator)
    }

    fn service(
        repository: MockAuthenticatorRepository,
        clock: Arc<FixedClock>,
    ) -> CookieAuthenticatorService {
        let deps = AuthenticatorDeps::default()
            .with_clock(clock)
            .with_id_generator(id_generator("generated-id"));
        CookieAuthenticatorService::new(
            CookieAuthenticatorSettings::default(),
            Arc::new(repository),
            deps,
        )
        .unwrap()
    }

    fn browser() -> HttpRequestContext {
        HttpRequestContext::default().with_header("User-Agent", "Firefox")
    }

    #[tokio::test]
    async fn test_create_stamps_lifetime_and_fingerprint() {
        let now = Utc::now();
        let service = service(MockAuthenticatorRepository::new(), Arc::new(FixedClock::new(now)));

        let created = service
            .create(LoginInfo::new("credentials", "alice@example.com"), &browser())
            .await
            .unwrap();

        assert_eq!(created.id, "generated-id");
        assert_eq!(created.last_used, now);
        assert_eq!(created.expires_at, now + chrono::Duration::hours(12));
        assert_eq!(created.idle_timeout, Some(chrono::Duration::minutes(30)));
        assert!(created.fingerprint.is_some());
    }

    #[tokio::test]
    async fn test_create_fails_when_id_generation_fails() {
        let mut generator = MockIdGenerator::new();
        generator
            .expect_generate()
            .returning(|| Err(IdGeneratorError::RandomSource("exhausted".to_string())));
        let deps = AuthenticatorDeps::default().with_id_generator(Arc::new(generator));
        let service = CookieAuthenticatorService::new(
            CookieAuthenticatorSettings::default(),
            Arc::new(MockAuthenticatorRepository::new()),
            deps,
        )
        .unwrap();

        let error = service
            .create(LoginInfo::new("credentials", "alice@example.com"), &browser())
            .await
            .unwrap_err();

        assert_eq!(error.authenticator, "cookie-authenticator");
        assert_eq!(error.operation, Operation::Create);
    }

    #[tokio::test]
    async fn test_init_stores_and_sets_cookie() {
        let now = Utc::now();
        let a = authenticator(now, None);

        let mut repository = MockAuthenticatorRepository::new();
        repository
            .expect_add()
            .with(eq(a.clone()))
            .times(1)
            .returning(|a| Ok(a));
        let service = service(repository, Arc::new(FixedClock::new(now)));

        let mut response = HttpResponseContext::default();
        service.init(a, &mut response).await.unwrap();

        let cookie = response.cookie("authenticator").unwrap();
        assert_eq!(cookie.value(), "id");
        assert_eq!(cookie.max_age(), Some(::cookie::time::Duration::hours(12)));
    }

    #[tokio::test]
    async fn test_init_store_failure_leaves_response_unchanged() {
        let now = Utc::now();
        let mut repository = MockAuthenticatorRepository::new();
        repository
            .expect_add()
            .returning(|_| Err(RepositoryError::Storage("down".to_string())));
        let service = service(repository, Arc::new(FixedClock::new(now)));

        let mut response = HttpResponseContext::default();
        let result = service.init(authenticator(now, None), &mut response).await;

        assert!(result.is_ok());
        assert!(response.is_unmodified());
    }

    #[tokio::test]
    async fn test_retrieve_without_cookie() {
        let service = service(
            MockAuthenticatorRepository::new(),
            Arc::new(FixedClock::new(Utc::now())),
        );

        assert_eq!(service.retrieve(&browser()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_retrieve_matching_fingerprint() {
        let now = Utc::now();
        let clock = Arc::new(FixedClock::new(now));
        let request = browser().with_cookie("authenticator", "id");

        let mut stored = authenticator(now, None);
        stored.fingerprint = Some(
            AuthenticatorDeps::default()
                .fingerprint_generator
                .generate(&request),
        );
        let returned = stored.clone();

        let mut repository = MockAuthenticatorRepository::new();
        repository
            .expect_find()
            .with(eq("id"))
            .returning(move |_| Ok(Some(returned.clone())));
        let service = service(repository, clock);

        assert_eq!(service.retrieve(&request).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn test_retrieve_other_fingerprint_is_ignored() {
        let now = Utc::now();
        let mut stored = authenticator(now, None);
        stored.fingerprint = Some("another-client".to_string());

        let mut repository = MockAuthenticatorRepository::new();
        repository
            .expect_find()
            .returning(move |_| Ok(Some(stored.clone())));
        let service = service(repository, Arc::new(FixedClock::new(now)));

        let request = browser().with_cookie("authenticator", "id");
        assert_eq!(service.retrieve(&request).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_retrieve_store_failure() {
        let mut repository = MockAuthenticatorRepository::new();
        repository
            .expect_find()
            .returning(|_| Err(RepositoryError::Storage("down".to_string())));
        let service = service(repository, Arc::new(FixedClock::new(Utc::now())));

        let request = browser().with_cookie("authenticator", "id");
        let error = service.retrieve(&request).await.unwrap_err();

        assert_eq!(error.operation, Operation::Retrieve);
        assert_eq!(
            error.to_string(),
            "[cookie-authenticator] Could not retrieve authenticator"
        );
    }

    #[tokio::test]
    async fn test_renew_replaces_authenticator() {
        let now = Utc::now();
        let clock = Arc::new(FixedClock::new(now));
        let old = authenticator(now - chrono::Duration::hours(1), None);

        let mut repository = MockAuthenticatorRepository::new();
        repository
            .expect_remove()
            .with(eq("id"))
            .times(1)
            .returning(|_| Ok(()));
        repository.expect_add().times(1).returning(|a| Ok(a));
        let service = service(repository, clock);

        let mut response = HttpResponseContext::default();
        let renewed = service
            .renew(old.clone(), &browser(), &mut response)
            .await
            .unwrap();

        assert_eq!(renewed.id, "generated-id");
        assert_eq!(renewed.login_info, old.login_info);
        assert_eq!(renewed.expires_at, now + chrono::Duration::hours(12));
        assert_eq!(
            response.cookie("authenticator").map(|c| c.value()),
            Some("generated-id")
        );
    }

    #[tokio::test]
    async fn test_discard_removes_and_strips_cookie() {
        let now = Utc::now();
        let mut repository = MockAuthenticatorRepository::new();
        repository
            .expect_remove()
            .with(eq("id"))
            .times(1)
            .returning(|_| Ok(()));
        let service = service(repository, Arc::new(FixedClock::new(now)));

        let mut response = HttpResponseContext::default();
        service
            .discard(&authenticator(now, None), &mut response)
            .await
            .unwrap();

        let removal = response.cookie("authenticator").unwrap();
        assert_eq!(removal.value(), "");
        assert_eq!(removal.max_age(), Some(::cookie::time::Duration::ZERO));
    }

    #[tokio::test]
    async fn test_update_persists() {
        let now = Utc::now();
        let a = authenticator(now, Some(chrono::Duration::minutes(30)));

        let mut repository = MockAuthenticatorRepository::new();
        repository
            .expect_update()
            .with(eq(a.clone()))
            .times(1)
            .returning(|a| Ok(a));
        let service = service(repository, Arc::new(FixedClock::new(now)));

        let mut response = HttpResponseContext::default();
        service.update(a, &mut response).await.unwrap();
        assert!(response.is_unmodified());
    }

    #[tokio::test]
    async fn test_cookie_round_trip() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let repository = CacheAuthenticatorRepository::new(
            Arc::new(InMemoryCache::new()),
            clock.clone(),
        );
        let service = CookieAuthenticatorService::new(
            CookieAuthenticatorSettings::default(),
            Arc::new(repository),
            AuthenticatorDeps::default().with_clock(clock),
        )
        .unwrap();

        let created = service
            .create(LoginInfo::new("credentials", "alice@example.com"), &browser())
            .await
            .unwrap();
        let mut response = HttpResponseContext::default();
        service.init(created.clone(), &mut response).await.unwrap();

        let id = response.cookie("authenticator").unwrap().value().to_string();
        assert_eq!(id, created.id);

        let request = browser().with_cookie("authenticator", id.as_str());
        assert_eq!(service.retrieve(&request).await.unwrap(), Some(created.clone()));

        let stranger = HttpRequestContext::default()
            .with_header("User-Agent", "curl")
            .with_cookie("authenticator", id.as_str());
        assert_eq!(service.retrieve(&stranger).await.unwrap(), None);

        service
            .discard(&created, &mut HttpResponseContext::default())
            .await
            .unwrap();
        assert_eq!(service.retrieve(&request).await.unwrap(), None);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = CookieAuthenticatorSettings {
            expiry: Duration::ZERO,
            ..CookieAuthenticatorSettings::default()
        };

        let result = CookieAuthenticatorService::new(
            settings,
            Arc::new(MockAuthenticatorRepository::new()),
            AuthenticatorDeps::default(),
        );

        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("`expiry` must be a positive duration".to_string())
        );
    }
}

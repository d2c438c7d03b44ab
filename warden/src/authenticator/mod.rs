//! Authenticator lifecycle.
//!
//! An [`Authenticator`] is the short-lived proof that a login happened. All
//! carriers share one value type and one service contract,
//! [`AuthenticatorService`]; the variants differ only in how the authenticator
//! travels between client and server:
//!
//! | service | carrier | backing store |
//! |---|---|---|
//! | [`CookieAuthenticatorService`] | cookie holding the id | required |
//! | [`BearerTokenAuthenticatorService`] | request header holding the id | required |
//! | [`SessionAuthenticatorService`] | session entry holding the whole authenticator | none |
//! | [`JwtAuthenticatorService`] | request header holding a signed JWT | optional |
//!
//! Expiry and idle timeout are logical: nothing evicts an authenticator when
//! it runs out. [`AuthenticationGuard`] checks validity whenever one is
//! retrieved and discards it at that point.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::context::RequestContext;
use crate::context::ResponseContext;
use crate::crypto::DefaultFingerprintGenerator;
use crate::crypto::FingerprintGenerator;
use crate::crypto::IdGenerator;
use crate::crypto::SecureRandomIdGenerator;
use crate::login_info::LoginInfo;

pub mod bearer;
pub mod cookie;
pub mod errors;
pub mod guard;
pub mod jwt;
pub mod repository;
pub mod session;
pub mod stateful;

pub use bearer::BearerTokenAuthenticatorService;
pub use bearer::BearerTokenAuthenticatorSettings;
pub use cookie::CookieAuthenticatorService;
pub use cookie::CookieAuthenticatorSettings;
pub use errors::AuthenticatorCause;
pub use errors::AuthenticatorError;
pub use errors::Operation;
pub use errors::RepositoryError;
pub use guard::Authenticated;
pub use guard::AuthenticationGuard;
pub use jwt::JwtAuthenticatorService;
pub use jwt::JwtAuthenticatorSettings;
pub use repository::AuthenticatorRepository;
pub use repository::CacheAuthenticatorRepository;
pub use repository::CacheLayer;
pub use repository::InMemoryCache;
pub use session::SessionAuthenticatorService;
pub use session::SessionAuthenticatorSettings;

/// Proof of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authenticator {
    /// Opaque random identifier
    pub id: String,

    pub login_info: LoginInfo,

    pub last_used: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Maximum time between two uses, serialized in milliseconds
    #[serde(default, with = "optional_millis")]
    pub idle_timeout: Option<Duration>,

    /// Client fingerprint the authenticator is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    /// Extra claims embedded by the JWT carrier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_claims: Option<Map<String, Value>>,
}

impl Authenticator {
    /// True once `now` reaches the absolute expiration date.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True once the authenticator has been idle for longer than its idle timeout.
    pub fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        match self.idle_timeout {
            Some(idle_timeout) => now >= self.last_used + idle_timeout,
            None => false,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && !self.is_timed_out(now)
    }

    /// Refresh `last_used` if idle tracking is enabled.
    pub fn touch(self, now: DateTime<Utc>) -> Touched {
        if self.idle_timeout.is_some() {
            Touched::Touched(Self {
                last_used: now,
                ..self
            })
        } else {
            Touched::Untouched(self)
        }
    }

    /// Time left until expiration, zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

/// Outcome of [`AuthenticatorService::touch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Touched {
    /// `last_used` was refreshed and must be persisted with `update`
    Touched(Authenticator),

    /// Idle tracking is disabled; nothing changed
    Untouched(Authenticator),
}

impl Touched {
    pub fn is_touched(&self) -> bool {
        matches!(self, Touched::Touched(_))
    }

    pub fn into_inner(self) -> Authenticator {
        match self {
            Touched::Touched(authenticator) | Touched::Untouched(authenticator) => authenticator,
        }
    }
}

/// Lifecycle operations shared by every authenticator carrier.
#[async_trait]
pub trait AuthenticatorService: Send + Sync + 'static {
    /// Identifier of the carrier, used in errors and logs.
    fn id(&self) -> &'static str;

    /// Current time according to the service clock.
    fn now(&self) -> DateTime<Utc>;

    /// Create a fresh authenticator for a login.
    ///
    /// # Errors
    /// * `IdGenerator` - No identifier could be generated
    async fn create(
        &self,
        login_info: LoginInfo,
        request: &dyn RequestContext,
    ) -> Result<Authenticator, AuthenticatorError>;

    /// Extract the authenticator carried by a request.
    ///
    /// Returns `None` when the request carries none, or one that is unknown,
    /// unreadable or bound to another client. Validity is not checked here.
    ///
    /// # Errors
    /// * `Repository` - Backing store failed
    async fn retrieve(
        &self,
        request: &dyn RequestContext,
    ) -> Result<Option<Authenticator>, AuthenticatorError>;

    /// Refresh `last_used` if the authenticator tracks idle time.
    fn touch(&self, authenticator: Authenticator) -> Touched {
        authenticator.touch(self.now())
    }

    /// Persist a new authenticator and embed its carrier into the response.
    ///
    /// A backing store failure is logged and leaves the response unmodified.
    async fn init(
        &self,
        authenticator: Authenticator,
        response: &mut dyn ResponseContext,
    ) -> Result<(), AuthenticatorError>;

    /// Persist a touched authenticator and refresh its carrier where needed.
    async fn update(
        &self,
        authenticator: Authenticator,
        response: &mut dyn ResponseContext,
    ) -> Result<(), AuthenticatorError>;

    /// Replace an authenticator with a fresh one for the same login.
    async fn renew(
        &self,
        authenticator: Authenticator,
        request: &dyn RequestContext,
        response: &mut dyn ResponseContext,
    ) -> Result<Authenticator, AuthenticatorError>;

    /// Invalidate an authenticator and strip its carrier from the response.
    async fn discard(
        &self,
        authenticator: &Authenticator,
        response: &mut dyn ResponseContext,
    ) -> Result<(), AuthenticatorError>;
}

/// Collaborators shared by the authenticator services.
#[derive(Clone)]
pub struct AuthenticatorDeps {
    pub id_generator: Arc<dyn IdGenerator>,
    pub fingerprint_generator: Arc<dyn FingerprintGenerator>,
    pub clock: Arc<dyn Clock>,
}

impl AuthenticatorDeps {
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }
}

impl Default for AuthenticatorDeps {
    fn default() -> Self {
        Self {
            id_generator: Arc::new(SecureRandomIdGenerator::default()),
            fingerprint_generator: Arc::new(DefaultFingerprintGenerator::default()),
            clock: Arc::new(SystemClock),
        }
    }
}

mod optional_millis {
    use chrono::Duration;
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => s.serialize_some(&duration.num_milliseconds()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<i64>::deserialize(d)?.map(Duration::milliseconds))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn authenticator(now: DateTime<Utc>, idle_timeout: Option<Duration>) -> Authenticator {
        Authenticator {
            id: "id".to_string(),
            login_info: LoginInfo::new("credentials", "alice@example.com"),
            last_used: now,
            expires_at: now + Duration::hours(12),
            idle_timeout,
            fingerprint: None,
            custom_claims: None,
        }
    }

    #[test]
    fn test_valid_when_fresh() {
        let now = Utc::now();
        let a = authenticator(now, Some(Duration::minutes(30)));

        assert!(a.is_valid(now));
        assert!(a.is_valid(now + Duration::minutes(29)));
    }

    #[test]
    fn test_expired_regardless_of_idle_timeout() {
        let now = Utc::now();
        let mut a = authenticator(now, None);
        a.expires_at = now - Duration::hours(1);

        assert!(a.is_expired(now));
        assert!(!a.is_timed_out(now));
        assert!(!a.is_valid(now));
    }

    #[test]
    fn test_timed_out_after_idle_period() {
        let now = Utc::now();
        let a = authenticator(now, Some(Duration::minutes(30)));
        let later = now + Duration::minutes(30);

        assert!(!a.is_expired(later));
        assert!(a.is_timed_out(later));
        assert!(!a.is_valid(later));
    }

    #[test]
    fn test_validity_matches_definition() {
        let now = Utc::now();
        let offsets = [-60, -1, 0, 1, 29, 30, 31, 719, 720, 721];
        let idle_timeouts = [None, Some(Duration::minutes(30))];

        for idle_timeout in idle_timeouts {
            let a = authenticator(now, idle_timeout);
            for minutes in offsets {
                let at = now + Duration::minutes(minutes);
                let expected = at < a.expires_at
                    && idle_timeout.map_or(true, |idle| at < a.last_used + idle);
                assert_eq!(a.is_valid(at), expected, "idle {:?} at +{}m", idle_timeout, minutes);
            }
        }
    }

    #[test]
    fn test_touch_with_idle_timeout() {
        let now = Utc::now();
        let a = authenticator(now, Some(Duration::minutes(30)));
        let later = now + Duration::minutes(10);

        let touched = a.clone().touch(later);

        assert!(touched.is_touched());
        let touched = touched.into_inner();
        assert_eq!(touched.last_used, later);
        assert_eq!(touched.expires_at, a.expires_at);
    }

    #[test]
    fn test_touch_without_idle_timeout_is_noop() {
        let now = Utc::now();
        let a = authenticator(now, None);

        let touched = a.clone().touch(now + Duration::minutes(10));

        assert_eq!(touched, Touched::Untouched(a));
    }

    #[test]
    fn test_serde_round_trip() {
        let now = Utc::now();
        let mut a = authenticator(now, Some(Duration::minutes(30)));
        a.fingerprint = Some("fingerprint".to_string());

        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["idleTimeout"], 30 * 60 * 1000);
        assert_eq!(json["loginInfo"]["providerID"], "credentials");

        let decoded: Authenticator = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, a);
    }

    #[test]
    fn test_remaining() {
        let now = Utc::now();
        let a = authenticator(now, None);

        assert_eq!(a.remaining(now), Duration::hours(12));
        assert_eq!(a.remaining(now + Duration::hours(13)), Duration::zero());
    }
}

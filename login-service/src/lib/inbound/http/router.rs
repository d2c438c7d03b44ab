use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;
use warden::auth_info::AuthInfoKind;
use warden::auth_info::InMemoryAuthInfoDao;
use warden::authenticator::AuthenticatorRepository;
use warden::authenticator::CacheAuthenticatorRepository;
use warden::authenticator::InMemoryCache;
use warden::authenticator::JwtAuthenticatorService;
use warden::context::SessionCookie;
use warden::crypto::Crypter;
use warden::crypto::SecureRandomIdGenerator;
use warden::crypto::Signer;
use warden::password::Argon2PasswordHasher;
use warden::password::PasswordHasherRegistry;
use warden::password::Sha256PasswordHasher;
use warden::providers::oauth2::AccessTokenClient;
use warden::providers::oauth2::CookieStateProvider;
use warden::providers::oauth2::OAuth2Provider;
use warden::providers::oauth2::ProfileClient;
use warden::providers::JsonProfileParser;
use warden::AuthInfoRegistry;
use warden::AuthenticationGuard;
use warden::AuthenticatorDeps;
use warden::Clock;
use warden::ConfigError;

use super::handlers::me::me;
use super::handlers::oauth2::oauth2_sign_in;
use super::handlers::renew::renew;
use super::handlers::sign_in::sign_in;
use super::handlers::sign_out::sign_out;
use super::handlers::sign_up::sign_up;
use super::middleware::authenticate as auth_middleware;
use crate::config::Config;
use crate::domain::account::service::AccountService;
use crate::outbound::repositories::InMemoryAccountRepository;

#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<AccountService<InMemoryAccountRepository>>,
    pub authenticator: Arc<JwtAuthenticatorService>,
    pub guard: AuthenticationGuard<JwtAuthenticatorService>,
    pub oauth2: Arc<OAuth2Provider<JsonProfileParser>>,
    pub session_cookie: Arc<SessionCookie>,
}

/// Outbound clients the OAuth2 provider talks to.
pub struct OAuth2Clients {
    pub access_token: Arc<dyn AccessTokenClient>,
    pub profile: Arc<dyn ProfileClient>,
}

impl AppState {
    /// Wire the in-memory stores, the JWT authenticator and the OAuth2
    /// provider from configuration.
    ///
    /// # Errors
    /// Any invalid setting, reported before the server starts.
    pub fn from_config(
        config: &Config,
        clients: OAuth2Clients,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let signer = Signer::new(config.crypto.signer.clone())?;
        let crypter = Crypter::new(config.crypto.crypter.clone())?;
        config.session.validate()?;

        let auth_info = AuthInfoRegistry::builder()
            .register(AuthInfoKind::Password, Arc::new(InMemoryAuthInfoDao::new()))
            .register(AuthInfoKind::OAuth2, Arc::new(InMemoryAuthInfoDao::new()))
            .build();
        let hashers = PasswordHasherRegistry::new(
            Arc::new(Argon2PasswordHasher::new()),
            vec![Arc::new(Sha256PasswordHasher)],
        );
        let account_service = Arc::new(AccountService::new(
            Arc::new(InMemoryAccountRepository::new()),
            auth_info,
            hashers,
        ));

        let deps = AuthenticatorDeps::default().with_clock(clock.clone());
        let authenticator_repository: Arc<dyn AuthenticatorRepository> = Arc::new(
            CacheAuthenticatorRepository::new(Arc::new(InMemoryCache::new()), clock.clone()),
        );
        let authenticator = Arc::new(JwtAuthenticatorService::new(
            config.jwt.clone(),
            crypter,
            Some(authenticator_repository),
            deps,
        )?);

        let state_provider = CookieStateProvider::new(
            config.oauth2.state.clone(),
            signer.clone(),
            Arc::new(SecureRandomIdGenerator::default()),
            clock,
        )?;
        let oauth2 = OAuth2Provider::new(
            config.oauth2.provider_id.clone(),
            config.oauth2.settings.clone(),
            Arc::new(state_provider),
            clients.access_token,
            clients.profile,
            JsonProfileParser::new(config.oauth2.profile.clone()),
        )?;

        Ok(Self {
            account_service,
            guard: AuthenticationGuard::new(authenticator.clone()),
            authenticator,
            oauth2: Arc::new(oauth2),
            session_cookie: Arc::new(SessionCookie::new(config.session.clone(), signer)),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/users", post(sign_up))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/oauth2/authorize", get(oauth2_sign_in))
        .route("/api/auth/oauth2/callback", get(oauth2_sign_in));

    let protected_routes = Router::new()
        .route("/api/me", get(me))
        .route("/api/auth/renew", post(renew))
        .route("/api/auth/sign-out", post(sign_out))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use login_service::config::Config;
use login_service::config::CryptoConfig;
use login_service::config::OAuth2Config;
use login_service::config::ServerConfig;
use login_service::inbound::http::router::create_router;
use login_service::inbound::http::router::AppState;
use login_service::inbound::http::router::OAuth2Clients;
use serde_json::json;
use serde_json::Value;
use warden::auth_info::OAuth2Info;
use warden::authenticator::JwtAuthenticatorSettings;
use warden::context::CookieSettings;
use warden::crypto::CrypterSettings;
use warden::crypto::SignerSettings;
use warden::providers::oauth2::AccessTokenClient;
use warden::providers::oauth2::AccessTokenRequest;
use warden::providers::oauth2::CookieStateSettings;
use warden::providers::oauth2::OAuth2Settings;
use warden::providers::oauth2::ProfileClient;
use warden::providers::ClientError;
use warden::providers::ProfileFields;
use warden::SystemClock;

pub const TOKEN_HEADER: &str = "X-Auth-Token";
pub const STATE_COOKIE: &str = "OAuth2State";
pub const VALID_CODE: &str = "valid-code";
const PROVIDER_ACCESS_TOKEN: &str = "gho_test_access_token";

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
}

/// Stands in for the provider's token and profile endpoints
struct StubProvider;

#[async_trait]
impl AccessTokenClient for StubProvider {
    async fn exchange(&self, request: AccessTokenRequest) -> Result<Value, ClientError> {
        if request.code != VALID_CODE {
            return Err(ClientError("bad_verification_code".to_string()));
        }
        Ok(json!({
            "access_token": PROVIDER_ACCESS_TOKEN,
            "token_type": "bearer",
            "scope": "read:user"
        }))
    }
}

#[async_trait]
impl ProfileClient for StubProvider {
    async fn fetch(&self, info: &OAuth2Info) -> Result<Value, ClientError> {
        if info.access_token != PROVIDER_ACCESS_TOKEN {
            return Err(ClientError("Bad credentials".to_string()));
        }
        Ok(json!({
            "id": 583231,
            "login": "octocat",
            "name": "The Octocat",
            "email": "octocat@github.com"
        }))
    }
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let provider = Arc::new(StubProvider);
        let state = AppState::from_config(
            &test_config(port),
            OAuth2Clients {
                access_token: provider.clone(),
                profile: provider,
            },
            Arc::new(SystemClock),
        )
        .expect("Invalid test configuration");

        let router = create_router(state);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::builder()
                .cookie_store(true)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("Failed to create reqwest client"),
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Helper to make GET request carrying a token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).header(TOKEN_HEADER, token)
    }

    /// Helper to make POST request carrying a token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).header(TOKEN_HEADER, token)
    }

    /// Helper to register an account
    pub async fn sign_up(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/users")
            .json(&json!({
                "email": email,
                "display_name": "Alice",
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Helper to sign in, returning the issued token
    pub async fn sign_in(&self, email: &str, password: &str) -> String {
        let response = self
            .post("/api/auth/sign-in")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: Value = response.json().await.expect("Failed to parse response");
        body["data"]["token"]["token"]
            .as_str()
            .expect("Token missing from response")
            .to_string()
    }
}

fn test_config(port: u16) -> Config {
    Config {
        server: ServerConfig { http_port: port },
        crypto: CryptoConfig {
            signer: SignerSettings::new("test-signer-key-0123456789"),
            crypter: CrypterSettings::new("test-crypter-key-0123456789"),
        },
        session: CookieSettings {
            secure: false,
            ..CookieSettings::named("session")
        },
        jwt: JwtAuthenticatorSettings {
            header_name: TOKEN_HEADER.to_string(),
            issuer_claim: "login-service-test".to_string(),
            encrypt_subject: true,
            expiry: Duration::from_secs(60 * 60),
            idle_timeout: Some(Duration::from_secs(30 * 60)),
            shared_secret: "test-secret-key-for-jwt-signing-at-least-32-bytes".to_string(),
        },
        oauth2: OAuth2Config {
            provider_id: "github".to_string(),
            settings: OAuth2Settings {
                authorization_url: "https://github.com/login/oauth/authorize".to_string(),
                access_token_url: "https://github.com/login/oauth/access_token".to_string(),
                redirect_url: format!("http://127.0.0.1:{}/api/auth/oauth2/callback", port),
                client_id: "test-client".to_string(),
                client_secret: "test-secret".to_string(),
                scope: Some("read:user user:email".to_string()),
                authorization_params: Default::default(),
                access_token_params: Default::default(),
            },
            state: CookieStateSettings {
                cookie: CookieSettings {
                    secure: false,
                    max_age: Some(Duration::from_secs(5 * 60)),
                    ..CookieSettings::named(STATE_COOKIE)
                },
                expiry: Duration::from_secs(5 * 60),
            },
            profile: ProfileFields::default(),
        },
    }
}

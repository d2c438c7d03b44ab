use std::env;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use warden::authenticator::JwtAuthenticatorSettings;
use warden::context::CookieSettings;
use warden::crypto::CrypterSettings;
use warden::crypto::SignerSettings;
use warden::providers::oauth2::CookieStateSettings;
use warden::providers::oauth2::OAuth2Settings;
use warden::providers::ProfileFields;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub crypto: CryptoConfig,
    #[serde(default = "default_session_cookie")]
    pub session: CookieSettings,
    pub jwt: JwtAuthenticatorSettings,
    pub oauth2: OAuth2Config,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

/// Keys for values that round-trip through the client.
#[derive(Debug, Deserialize, Clone)]
pub struct CryptoConfig {
    pub signer: SignerSettings,
    pub crypter: CrypterSettings,
}

/// The single OAuth2 provider this service signs users in with.
#[derive(Debug, Deserialize, Clone)]
pub struct OAuth2Config {
    pub provider_id: String,
    #[serde(flatten)]
    pub settings: OAuth2Settings,
    #[serde(default)]
    pub state: CookieStateSettings,
    #[serde(default)]
    pub profile: ProfileFields,
}

fn default_session_cookie() -> CookieSettings {
    CookieSettings::named("session")
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (SERVER__HTTP_PORT, JWT__SHARED_SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: JWT__SHARED_SECRET=... overrides jwt.shared_secret
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;

        Ok(config)
    }
}

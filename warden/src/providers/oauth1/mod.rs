pub mod provider;
pub mod secret;

pub use provider::OAuth1Provider;
pub use provider::OAuth1Service;
pub use provider::OAuth1Settings;
pub use secret::CookieSecret;
pub use secret::CookieSecretProvider;
pub use secret::CookieSecretSettings;

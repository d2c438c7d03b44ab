pub mod provider;
pub mod state;

pub use provider::AccessTokenClient;
pub use provider::AccessTokenRequest;
pub use provider::OAuth2Provider;
pub use provider::OAuth2Settings;
pub use provider::ProfileClient;
pub use state::CookieState;
pub use state::CookieStateProvider;
pub use state::CookieStateSettings;

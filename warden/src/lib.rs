//! Authentication building blocks for web services.
//!
//! Provides:
//! - Authenticators that prove a past login, carried in a cookie, the client
//!   session, a request header or a signed JWT
//! - Identity providers: identifier/password credentials with transparent
//!   password migration, OAuth2 and OAuth1 redirect flows
//! - Per-kind storage of provider credential material
//! - Signing, encryption, fingerprinting and identifier generation
//!
//! Nothing here depends on a web framework. Hosts implement
//! [`RequestContext`] and [`ResponseContext`], or use the `http` crate
//! adapters in [`context::http`].
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use warden::password::{Argon2PasswordHasher, PasswordHasher};
//!
//! let hasher = Argon2PasswordHasher::new();
//! let info = hasher.hash("my_password").unwrap();
//! assert_eq!(info.hasher, "argon2");
//! assert!(hasher.matches(&info, "my_password").unwrap());
//! ```
//!
//! ## Signed Values
//! ```
//! use warden::crypto::{Signer, SignerSettings};
//!
//! let signer = Signer::new(SignerSettings::new("signer_key_of_16_bytes")).unwrap();
//! let signed = signer.sign("state");
//! assert_eq!(signer.extract(&signed).unwrap(), "state");
//! ```

pub mod auth_info;
pub mod authenticator;
pub mod clock;
pub mod context;
pub mod crypto;
pub mod jwt;
pub mod login_info;
pub mod password;
pub mod providers;
pub mod settings;

// Re-export commonly used items
pub use auth_info::AuthInfo;
pub use auth_info::AuthInfoRegistry;
pub use authenticator::AuthenticationGuard;
pub use authenticator::Authenticator;
pub use authenticator::AuthenticatorDeps;
pub use authenticator::AuthenticatorError;
pub use authenticator::AuthenticatorService;
pub use clock::Clock;
pub use clock::SystemClock;
pub use context::RequestContext;
pub use context::ResponseContext;
pub use login_info::LoginInfo;
pub use settings::ConfigError;

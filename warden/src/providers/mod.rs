//! Providers that establish who a user is.
//!
//! [`CredentialsProvider`] checks an identifier and password. The OAuth
//! providers drive the redirect flows and keep their anti-forgery values in
//! signed cookies between the two legs.

use url::Url;

pub mod credentials;
pub mod errors;
pub mod oauth1;
pub mod oauth2;
pub mod profile;

pub use credentials::Credentials;
pub use credentials::CredentialsProvider;
pub use errors::ClientError;
pub use errors::CredentialsError;
pub use errors::OAuth1Error;
pub use errors::OAuth2Error;
pub use errors::ProfileError;
pub use errors::SecretError;
pub use errors::StateError;
pub use profile::CommonSocialProfile;
pub use profile::JsonProfileParser;
pub use profile::ProfileFields;
pub use profile::ProfileParser;

/// Result of one step of a redirect-based flow.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthenticationOutcome<A> {
    /// Send the user agent to the provider
    Redirect(Url),

    /// The provider confirmed the user
    Authenticated(A),
}

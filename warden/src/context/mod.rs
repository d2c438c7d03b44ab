//! Request and response capabilities the authenticators depend on.
//!
//! Authenticators never see a concrete web framework. They read carriers from
//! a [`RequestContext`] and write them into a [`ResponseContext`]; the
//! [`http`] module adapts both to the `http` crate types.

use ::cookie::Cookie;

pub mod cookie;
pub mod http;

pub use self::cookie::CookieSettings;
pub use self::cookie::SameSitePolicy;
pub use self::http::HttpRequestContext;
pub use self::http::HttpResponseContext;
pub use self::http::SessionCookie;

/// Read access to the inbound request.
pub trait RequestContext: Send + Sync {
    /// Header value by case-insensitive name.
    fn header(&self, name: &str) -> Option<&str>;

    /// Cookie value by name.
    fn cookie(&self, name: &str) -> Option<&str>;

    /// Value stored in the client session.
    fn session_value(&self, key: &str) -> Option<&str>;

    /// Query string parameter.
    fn query_param(&self, name: &str) -> Option<&str>;

    /// Address of the remote peer, if the host knows it.
    fn remote_address(&self) -> Option<&str>;
}

/// Write access to the outbound response.
pub trait ResponseContext: Send {
    fn set_header(&mut self, name: &str, value: String);

    fn set_cookie(&mut self, cookie: Cookie<'static>);

    /// Instruct the client to drop a cookie.
    fn discard_cookie(&mut self, cookie: Cookie<'static>);

    fn set_session_value(&mut self, key: &str, value: String);

    fn remove_session_value(&mut self, key: &str);
}

//! Adapter between the capability interfaces and the `http` crate.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use cookie::Cookie;
use http::header::COOKIE;
use http::header::SET_COOKIE;
use http::request::Parts;
use http::HeaderMap;
use http::HeaderName;
use http::HeaderValue;

use super::CookieSettings;
use super::RequestContext;
use super::ResponseContext;
use crate::crypto::Signer;

/// Client session stored in a signed cookie.
///
/// The session is a string map serialized as JSON, Base64 encoded and signed.
/// A missing, tampered or malformed cookie reads as an empty session.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    settings: CookieSettings,
    signer: Signer,
}

impl SessionCookie {
    pub fn new(settings: CookieSettings, signer: Signer) -> Self {
        Self { settings, signer }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// Decode the session from the raw cookie value.
    pub fn read(&self, value: &str) -> HashMap<String, String> {
        let decoded = self
            .signer
            .extract(value)
            .ok()
            .and_then(|data| URL_SAFE_NO_PAD.decode(data).ok())
            .and_then(|bytes| serde_json::from_slice(&bytes).ok());

        match decoded {
            Some(session) => session,
            None => {
                tracing::debug!(cookie = %self.settings.name, "Ignoring unreadable session cookie");
                HashMap::new()
            }
        }
    }

    /// Encode the session into a cookie, or a removal cookie when empty.
    ///
    /// # Errors
    /// The session could not be written as JSON.
    pub fn write(
        &self,
        session: &HashMap<String, String>,
    ) -> Result<Cookie<'static>, serde_json::Error> {
        if session.is_empty() {
            return Ok(self.settings.removal());
        }

        let json = serde_json::to_vec(session)?;
        let value = self.signer.sign(&URL_SAFE_NO_PAD.encode(json));
        Ok(self.settings.build(value))
    }
}

/// [`RequestContext`] backed by the parts of an `http::Request`.
#[derive(Debug, Clone, Default)]
pub struct HttpRequestContext {
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    session: HashMap<String, String>,
    query: HashMap<String, String>,
    remote_address: Option<String>,
}

impl HttpRequestContext {
    /// Capture headers, cookies, query parameters and the session of a request.
    pub fn from_parts(parts: &Parts, session_cookie: &SessionCookie) -> Self {
        let mut context = Self::default();

        for (name, value) in parts.headers.iter() {
            if let Ok(value) = value.to_str() {
                context
                    .headers
                    .entry(name.as_str().to_string())
                    .or_insert_with(|| value.to_string());
            }
        }

        context.cookies = parse_cookies(&parts.headers);

        if let Some(query) = parts.uri.query() {
            context.query = url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect();
        }

        if let Some(raw) = context.cookies.get(session_cookie.name()) {
            context.session = session_cookie.read(raw);
        }

        context
    }

    pub fn with_remote_address(mut self, address: impl Into<String>) -> Self {
        self.remote_address = Some(address.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_session_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.session.insert(key.into(), value.into());
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn session(&self) -> &HashMap<String, String> {
        &self.session
    }
}

impl RequestContext for HttpRequestContext {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    fn session_value(&self, key: &str) -> Option<&str> {
        self.session.get(key).map(String::as_str)
    }

    fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    fn remote_address(&self) -> Option<&str> {
        self.remote_address.as_deref()
    }
}

/// [`ResponseContext`] that records mutations and applies them to a `HeaderMap`.
#[derive(Debug, Clone, Default)]
pub struct HttpResponseContext {
    headers: Vec<(String, String)>,
    cookies: Vec<Cookie<'static>>,
    session: HashMap<String, String>,
    session_changed: bool,
}

impl HttpResponseContext {
    /// Start a response whose session continues the request's session.
    pub fn for_request(request: &HttpRequestContext) -> Self {
        Self {
            session: request.session.clone(),
            ..Self::default()
        }
    }

    /// Last value set for a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Last cookie set under `name`, including removal cookies.
    pub fn cookie(&self, name: &str) -> Option<&Cookie<'static>> {
        self.cookies.iter().rev().find(|c| c.name() == name)
    }

    pub fn session_value(&self, key: &str) -> Option<&str> {
        self.session.get(key).map(String::as_str)
    }

    /// True when nothing has been written.
    pub fn is_unmodified(&self) -> bool {
        self.headers.is_empty() && self.cookies.is_empty() && !self.session_changed
    }

    /// Write the recorded headers, cookies and session into `headers`.
    pub fn apply(self, session_cookie: &SessionCookie, headers: &mut HeaderMap) {
        for (name, value) in self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping header that is not valid HTTP"),
            }
        }

        let mut cookies = self.cookies;
        if self.session_changed {
            match session_cookie.write(&self.session) {
                Ok(cookie) => cookies.push(cookie),
                Err(e) => tracing::warn!(error = %e, "Dropping session that could not be encoded"),
            }
        }

        for cookie in cookies {
            match HeaderValue::from_str(&cookie.encoded().to_string()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(_) => {
                    tracing::warn!(cookie = %cookie.name(), "Dropping cookie that is not valid HTTP")
                }
            }
        }
    }
}

impl ResponseContext for HttpResponseContext {
    fn set_header(&mut self, name: &str, value: String) {
        self.headers.push((name.to_string(), value));
    }

    fn set_cookie(&mut self, cookie: Cookie<'static>) {
        self.cookies.push(cookie);
    }

    fn discard_cookie(&mut self, mut cookie: Cookie<'static>) {
        cookie.make_removal();
        self.cookies.push(cookie);
    }

    fn set_session_value(&mut self, key: &str, value: String) {
        self.session.insert(key.to_string(), value);
        self.session_changed = true;
    }

    fn remove_session_value(&mut self, key: &str) {
        if self.session.remove(key).is_some() {
            self.session_changed = true;
        }
    }
}

fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse_encoded(value.to_string()))
        .filter_map(Result::ok)
        .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
        .collect()
}

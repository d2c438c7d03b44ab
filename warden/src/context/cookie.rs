use std::time::Duration;

use cookie::Cookie;
use cookie::SameSite;
use serde::Deserialize;

use crate::settings::require_non_empty;
use crate::settings::require_optional_positive;
use crate::settings::ConfigError;

/// Controls whether a cookie is sent with cross-site requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

impl From<SameSitePolicy> for SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::None => SameSite::None,
        }
    }
}

/// Attributes of a cookie carrier, passed through to the client unchanged.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSitePolicy,

    /// `None` produces a session cookie
    #[serde(with = "humantime_serde")]
    pub max_age: Option<Duration>,
}

impl CookieSettings {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("cookie.name", &self.name)?;
        require_non_empty("cookie.path", &self.path)?;
        require_optional_positive("cookie.max_age", self.max_age)
    }

    /// Build a cookie carrying `value` with the configured attributes.
    pub fn build(&self, value: String) -> Cookie<'static> {
        let mut builder = Cookie::build((self.name.clone(), value))
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(self.http_only)
            .same_site(self.same_site.into());

        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(max_age) = self.max_age {
            let seconds = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
            builder = builder.max_age(cookie::time::Duration::seconds(seconds));
        }

        builder.build()
    }

    /// Build the cookie that tells the client to forget this carrier.
    pub fn removal(&self) -> Cookie<'static> {
        let mut cookie = self.build(String::new());
        cookie.make_removal();
        cookie
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "id".to_string(),
            path: "/".to_string(),
            domain: None,
            secure: true,
            http_only: true,
            same_site: SameSitePolicy::Lax,
            max_age: None,
        }
    }
}

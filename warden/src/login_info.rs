use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Provider-qualified identity key.
///
/// Identifies a principal within one authentication source, e.g.
/// `("credentials", "alice@example.com")` or `("github", "583231")`.
/// Used as the join key for every authenticator and auth-info lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoginInfo {
    #[serde(rename = "providerID")]
    pub provider_id: String,

    #[serde(rename = "providerKey")]
    pub provider_key: String,
}

impl LoginInfo {
    pub fn new(provider_id: impl Into<String>, provider_key: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            provider_key: provider_key.into(),
        }
    }
}

impl fmt::Display for LoginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_id, self.provider_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_field_names() {
        let login_info = LoginInfo::new("credentials", "alice@example.com");
        let json = serde_json::to_value(&login_info).unwrap();

        assert_eq!(json["providerID"], "credentials");
        assert_eq!(json["providerKey"], "alice@example.com");
    }

    #[test]
    fn test_display() {
        let login_info = LoginInfo::new("github", "583231");
        assert_eq!(login_info.to_string(), "github:583231");
    }
}

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::errors::ProfileError;
use crate::login_info::LoginInfo;

/// Profile fields most social providers expose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonSocialProfile {
    pub login_info: LoginInfo,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Turns the JSON a provider returns into a profile.
pub trait ProfileParser: Send + Sync + 'static {
    type Profile: Send;

    fn parse(&self, provider_id: &str, json: &Value) -> Result<Self::Profile, ProfileError>;
}

/// Location of each profile field in the provider's JSON.
///
/// Paths are dot separated, e.g. `picture.data.url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileFields {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl Default for ProfileFields {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            first_name: Some("first_name".to_string()),
            last_name: Some("last_name".to_string()),
            full_name: Some("name".to_string()),
            email: Some("email".to_string()),
            avatar_url: Some("avatar_url".to_string()),
        }
    }
}

/// [`ProfileParser`] producing a [`CommonSocialProfile`] by field lookup.
#[derive(Debug, Clone, Default)]
pub struct JsonProfileParser {
    fields: ProfileFields,
}

impl JsonProfileParser {
    pub fn new(fields: ProfileFields) -> Self {
        Self { fields }
    }
}

impl ProfileParser for JsonProfileParser {
    type Profile = CommonSocialProfile;

    fn parse(&self, provider_id: &str, json: &Value) -> Result<CommonSocialProfile, ProfileError> {
        let id = lookup(json, &self.fields.id).ok_or_else(|| ProfileError::MissingField {
            provider_id: provider_id.to_string(),
            field: self.fields.id.clone(),
        })?;

        let optional = |path: &Option<String>| path.as_deref().and_then(|p| lookup(json, p));

        Ok(CommonSocialProfile {
            login_info: LoginInfo::new(provider_id, id),
            first_name: optional(&self.fields.first_name),
            last_name: optional(&self.fields.last_name),
            full_name: optional(&self.fields.full_name),
            email: optional(&self.fields.email),
            avatar_url: optional(&self.fields.avatar_url),
        })
    }
}

/// Scalar at a dotted path, rendered as a string.
fn lookup(json: &Value, path: &str) -> Option<String> {
    let value = path
        .split('.')
        .try_fold(json, |current, segment| current.get(segment))?;

    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_with_defaults() {
        let json = json!({
            "id": 583231,
            "name": "The Octocat",
            "email": "octocat@github.com",
            "avatar_url": "https://avatars.githubusercontent.com/u/583231"
        });

        let profile = JsonProfileParser::default().parse("github", &json).unwrap();

        assert_eq!(profile.login_info, LoginInfo::new("github", "583231"));
        assert_eq!(profile.full_name.as_deref(), Some("The Octocat"));
        assert_eq!(profile.first_name, None);
        assert_eq!(profile.email.as_deref(), Some("octocat@github.com"));
    }

    #[test]
    fn test_nested_fields() {
        let parser = JsonProfileParser::new(ProfileFields {
            id: "sub".to_string(),
            avatar_url: Some("picture.data.url".to_string()),
            ..ProfileFields::default()
        });
        let json = json!({
            "sub": "10769150350006150715113082367",
            "picture": { "data": { "url": "https://example.com/me.png" } }
        });

        let profile = parser.parse("google", &json).unwrap();

        assert_eq!(profile.login_info.provider_key, "10769150350006150715113082367");
        assert_eq!(profile.avatar_url.as_deref(), Some("https://example.com/me.png"));
    }

    #[test]
    fn test_missing_id() {
        let result = JsonProfileParser::default().parse("github", &json!({ "name": "x" }));

        assert_eq!(
            result,
            Err(ProfileError::MissingField {
                provider_id: "github".to_string(),
                field: "id".to_string()
            })
        );
    }
}

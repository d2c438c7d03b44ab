use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::state::CookieStateProvider;
use super::state::STATE_PARAM;
use crate::auth_info::OAuth2Info;
use crate::context::RequestContext;
use crate::context::ResponseContext;
use crate::providers::errors::ClientError;
use crate::providers::errors::OAuth2Error;
use crate::providers::profile::ProfileParser;
use crate::providers::AuthenticationOutcome;
use crate::settings::require_non_empty;
use crate::settings::require_url;
use crate::settings::ConfigError;

const CODE_PARAM: &str = "code";
const ERROR_PARAM: &str = "error";
const ACCESS_DENIED: &str = "access_denied";

#[derive(Debug, Clone, Deserialize)]
pub struct OAuth2Settings {
    pub authorization_url: String,
    pub access_token_url: String,
    pub redirect_url: String,
    pub client_id: String,
    pub client_secret: String,

    #[serde(default)]
    pub scope: Option<String>,

    /// Extra query parameters for the authorization redirect
    #[serde(default)]
    pub authorization_params: BTreeMap<String, String>,

    /// Extra form parameters for the access token request
    #[serde(default)]
    pub access_token_params: BTreeMap<String, String>,
}

impl OAuth2Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_url("authorization_url", &self.authorization_url)?;
        require_url("access_token_url", &self.access_token_url)?;
        require_url("redirect_url", &self.redirect_url)?;
        require_non_empty("client_id", &self.client_id)?;
        require_non_empty("client_secret", &self.client_secret)
    }
}

/// Authorization code exchange handed to the [`AccessTokenClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenRequest {
    pub url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub code: String,
    pub redirect_uri: String,
    pub params: BTreeMap<String, String>,
}

impl AccessTokenRequest {
    /// Form body of the token request.
    pub fn form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("client_id".to_string(), self.client_id.clone()),
            ("client_secret".to_string(), self.client_secret.clone()),
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), self.code.clone()),
            ("redirect_uri".to_string(), self.redirect_uri.clone()),
        ];
        form.extend(self.params.iter().map(|(k, v)| (k.clone(), v.clone())));
        form
    }
}

/// Performs the access token request against the provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessTokenClient: Send + Sync + 'static {
    /// Post the request and return the JSON response body.
    async fn exchange(&self, request: AccessTokenRequest) -> Result<Value, ClientError>;
}

/// Fetches the authenticated user's profile from the provider API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileClient: Send + Sync + 'static {
    async fn fetch(&self, info: &OAuth2Info) -> Result<Value, ClientError>;
}

/// OAuth2 authorization code flow for one provider.
pub struct OAuth2Provider<P: ProfileParser> {
    id: String,
    settings: OAuth2Settings,
    authorization_url: Url,
    access_token_url: Url,
    state: Arc<CookieStateProvider>,
    token_client: Arc<dyn AccessTokenClient>,
    profile_client: Arc<dyn ProfileClient>,
    parser: P,
}

impl<P: ProfileParser> OAuth2Provider<P> {
    /// Create an OAuth2 provider.
    ///
    /// # Arguments
    /// * `id` - Provider id stored in login info, e.g. `github`
    /// * `settings` - Endpoints, client credentials and extra parameters
    /// * `state` - Issues and checks the anti-CSRF state
    /// * `token_client` - Exchanges the authorization code
    /// * `profile_client` - Fetches the raw profile
    /// * `parser` - Builds a social profile from the raw one
    ///
    /// # Errors
    /// * `Empty` - The id or a required setting is blank
    /// * `InvalidUrl` - An endpoint is not an absolute URL
    pub fn new(
        id: impl Into<String>,
        settings: OAuth2Settings,
        state: Arc<CookieStateProvider>,
        token_client: Arc<dyn AccessTokenClient>,
        profile_client: Arc<dyn ProfileClient>,
        parser: P,
    ) -> Result<Self, ConfigError> {
        let id = id.into();
        require_non_empty("provider_id", &id)?;
        settings.validate()?;

        Ok(Self {
            authorization_url: require_url("authorization_url", &settings.authorization_url)?,
            access_token_url: require_url("access_token_url", &settings.access_token_url)?,
            id,
            settings,
            state,
            token_client,
            profile_client,
            parser,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drive one step of the authorization code flow.
    ///
    /// Without a `code` parameter the user is sent to the provider with a
    /// fresh state. With one, the state is checked and the code exchanged.
    ///
    /// # Errors
    /// * `AccessDenied` - The user declined the authorization
    /// * `Provider` - The provider redirected back with another error
    /// * `State` - The state round trip failed
    /// * `AccessToken`, `InvalidTokenResponse` - The code exchange failed
    pub async fn authenticate(
        &self,
        request: &dyn RequestContext,
        response: &mut dyn ResponseContext,
    ) -> Result<AuthenticationOutcome<OAuth2Info>, OAuth2Error> {
        if let Some(error) = request.query_param(ERROR_PARAM) {
            return Err(if error == ACCESS_DENIED {
                OAuth2Error::AccessDenied {
                    provider_id: self.id.clone(),
                }
            } else {
                OAuth2Error::Provider {
                    provider_id: self.id.clone(),
                    error: error.to_string(),
                }
            });
        }

        let Some(code) = request.query_param(CODE_PARAM) else {
            return self.redirect(response);
        };

        self.state.validate(&self.id, request)?;

        let token_request = AccessTokenRequest {
            url: self.access_token_url.clone(),
            client_id: self.settings.client_id.clone(),
            client_secret: self.settings.client_secret.clone(),
            code: code.to_string(),
            redirect_uri: self.settings.redirect_url.clone(),
            params: self.settings.access_token_params.clone(),
        };
        let json = self
            .token_client
            .exchange(token_request)
            .await
            .map_err(|source| OAuth2Error::AccessToken {
                provider_id: self.id.clone(),
                source,
            })?;

        let info = OAuth2Info::from_token_response(&json).ok_or_else(|| {
            OAuth2Error::InvalidTokenResponse {
                provider_id: self.id.clone(),
                reason: "`access_token` is missing".to_string(),
            }
        })?;

        self.state.discard(response);
        tracing::debug!(provider = %self.id, "Exchanged authorization code");
        Ok(AuthenticationOutcome::Authenticated(info))
    }

    /// Fetch and parse the profile belonging to an access token.
    pub async fn retrieve_profile(&self, info: &OAuth2Info) -> Result<P::Profile, OAuth2Error> {
        let json = self
            .profile_client
            .fetch(info)
            .await
            .map_err(|source| OAuth2Error::ProfileRequest {
                provider_id: self.id.clone(),
                source,
            })?;

        Ok(self.parser.parse(&self.id, &json)?)
    }

    fn redirect(
        &self,
        response: &mut dyn ResponseContext,
    ) -> Result<AuthenticationOutcome<OAuth2Info>, OAuth2Error> {
        let state = self
            .state
            .build()
            .map_err(|source| OAuth2Error::StateGeneration {
                provider_id: self.id.clone(),
                source,
            })?;

        let mut url = self.authorization_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.settings.client_id)
                .append_pair("redirect_uri", &self.settings.redirect_url)
                .append_pair("response_type", CODE_PARAM)
                .append_pair(STATE_PARAM, &state.value);
            if let Some(scope) = &self.settings.scope {
                query.append_pair("scope", scope);
            }
            for (name, value) in &self.settings.authorization_params {
                query.append_pair(name, value);
            }
        }

        self.state.publish(&state, response)?;
        Ok(AuthenticationOutcome::Redirect(url))
    }
}

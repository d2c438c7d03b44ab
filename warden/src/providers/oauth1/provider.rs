use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::secret::CookieSecretProvider;
use crate::auth_info::OAuth1Info;
use crate::context::RequestContext;
use crate::context::ResponseContext;
use crate::providers::errors::ClientError;
use crate::providers::errors::OAuth1Error;
use crate::providers::AuthenticationOutcome;
use crate::settings::require_non_empty;
use crate::settings::require_url;
use crate::settings::ConfigError;

const TOKEN_PARAM: &str = "oauth_token";
const VERIFIER_PARAM: &str = "oauth_verifier";
const DENIED_PARAM: &str = "denied";

#[derive(Debug, Clone, Deserialize)]
pub struct OAuth1Settings {
    pub request_token_url: String,
    pub access_token_url: String,
    pub authorization_url: String,
    pub callback_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl OAuth1Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_url("request_token_url", &self.request_token_url)?;
        require_url("access_token_url", &self.access_token_url)?;
        require_url("authorization_url", &self.authorization_url)?;
        require_url("callback_url", &self.callback_url)?;
        require_non_empty("consumer_key", &self.consumer_key)?;
        require_non_empty("consumer_secret", &self.consumer_secret)
    }
}

/// Signed OAuth1 requests against one provider, supplied by the host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuth1Service: Send + Sync + 'static {
    /// Obtain an unauthorized request token.
    async fn retrieve_request_token(&self, callback_url: &str) -> Result<OAuth1Info, ClientError>;

    /// Trade an authorized request token for an access token.
    async fn retrieve_access_token(
        &self,
        request_token: &OAuth1Info,
        verifier: &str,
    ) -> Result<OAuth1Info, ClientError>;
}

/// OAuth1 three-legged flow for one provider.
pub struct OAuth1Provider {
    id: String,
    settings: OAuth1Settings,
    authorization_url: Url,
    secrets: Arc<CookieSecretProvider>,
    service: Arc<dyn OAuth1Service>,
}

impl OAuth1Provider {
    pub fn new(
        id: impl Into<String>,
        settings: OAuth1Settings,
        secrets: Arc<CookieSecretProvider>,
        service: Arc<dyn OAuth1Service>,
    ) -> Result<Self, ConfigError> {
        let id = id.into();
        require_non_empty("provider_id", &id)?;
        settings.validate()?;

        Ok(Self {
            authorization_url: require_url("authorization_url", &settings.authorization_url)?,
            id,
            settings,
            secrets,
            service,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drive one step of the flow.
    ///
    /// Without `oauth_verifier` a request token is fetched, its secret
    /// published and the user redirected. With it, the secret is read back
    /// and the request token exchanged.
    pub async fn authenticate(
        &self,
        request: &dyn RequestContext,
        response: &mut dyn ResponseContext,
    ) -> Result<AuthenticationOutcome<OAuth1Info>, OAuth1Error> {
        if request.query_param(DENIED_PARAM).is_some() {
            return Err(OAuth1Error::AccessDenied {
                provider_id: self.id.clone(),
            });
        }

        match (
            request.query_param(TOKEN_PARAM),
            request.query_param(VERIFIER_PARAM),
        ) {
            (Some(token), Some(verifier)) => {
                let secret = self.secrets.retrieve(&self.id, request)?;
                let request_token = OAuth1Info {
                    token: token.to_string(),
                    secret: secret.value,
                };

                let access_token = self
                    .service
                    .retrieve_access_token(&request_token, verifier)
                    .await
                    .map_err(|source| OAuth1Error::AccessToken {
                        provider_id: self.id.clone(),
                        source,
                    })?;

                self.secrets.discard(response);
                Ok(AuthenticationOutcome::Authenticated(access_token))
            }
            _ => {
                let request_token = self
                    .service
                    .retrieve_request_token(&self.settings.callback_url)
                    .await
                    .map_err(|source| OAuth1Error::RequestToken {
                        provider_id: self.id.clone(),
                        source,
                    })?;

                let secret = self.secrets.build(&request_token);
                self.secrets.publish(&secret, response)?;

                let mut url = self.authorization_url.clone();
                url.query_pairs_mut()
                    .append_pair(TOKEN_PARAM, &request_token.token);
                Ok(AuthenticationOutcome::Redirect(url))
            }
        }
    }
}

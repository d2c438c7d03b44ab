use async_trait::async_trait;
use serde_json::Value;
use warden::auth_info::OAuth2Info;
use warden::providers::oauth2::AccessTokenClient;
use warden::providers::oauth2::AccessTokenRequest;
use warden::providers::oauth2::ProfileClient;
use warden::providers::ClientError;

/// OAuth2 client used when no outbound HTTP client is wired in.
///
/// The redirect leg and state round trip work as usual; every call to the
/// provider fails, so the callback reports a provider error.
#[derive(Debug, Clone, Default)]
pub struct UnavailableOAuth2Client;

#[async_trait]
impl AccessTokenClient for UnavailableOAuth2Client {
    async fn exchange(&self, request: AccessTokenRequest) -> Result<Value, ClientError> {
        tracing::warn!(url = %request.url, "No HTTP client configured for access token requests");
        Err(ClientError(format!(
            "No HTTP client configured for {}",
            request.url
        )))
    }
}

#[async_trait]
impl ProfileClient for UnavailableOAuth2Client {
    async fn fetch(&self, _info: &OAuth2Info) -> Result<Value, ClientError> {
        tracing::warn!("No HTTP client configured for profile requests");
        Err(ClientError(
            "No HTTP client configured for profile requests".to_string(),
        ))
    }
}

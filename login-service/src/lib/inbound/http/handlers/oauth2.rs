use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum::response::Response;
use serde::Serialize;
use warden::context::HttpResponseContext;
use warden::providers::AuthenticationOutcome;

use super::sign_in::issue_token;
use super::sign_in::TokenData;
use super::sign_up::AccountData;
use super::ApiError;
use super::ApiSuccess;
use super::ContextResponse;
use crate::domain::account::ports::AccountServicePort;
use crate::inbound::http::middleware::WardenRequest;
use crate::inbound::http::router::AppState;

/// Sign in through the configured OAuth2 provider.
///
/// Serves both legs of the flow: without a `code` the user agent is sent to
/// the provider, with one the code is exchanged and the account behind the
/// profile signed in.
pub async fn oauth2_sign_in(
    State(state): State<AppState>,
    WardenRequest(request): WardenRequest,
) -> Result<Response, ApiError> {
    let mut context = HttpResponseContext::for_request(&request);

    let info = match state.oauth2.authenticate(&request, &mut context).await? {
        AuthenticationOutcome::Redirect(url) => {
            tracing::debug!(provider = %state.oauth2.id(), "Redirecting to provider");
            let redirect = Redirect::to(url.as_str());
            return Ok(
                ContextResponse::new(redirect, context, state.session_cookie.clone())
                    .into_response(),
            );
        }
        AuthenticationOutcome::Authenticated(info) => info,
    };

    let profile = state.oauth2.retrieve_profile(&info).await?;
    let login_info = profile.login_info.clone();
    let account = state
        .account_service
        .sign_in_social(profile, info)
        .await?;

    let token = issue_token(&state, &request, login_info, &mut context).await?;
    tracing::info!(provider = %state.oauth2.id(), account_id = %account.id, "Signed in with provider");

    Ok(ContextResponse::new(
        ApiSuccess::new(
            StatusCode::OK,
            SocialSignInResponseData {
                account: (&account).into(),
                token,
            },
        ),
        context,
        state.session_cookie.clone(),
    )
    .into_response())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocialSignInResponseData {
    pub account: AccountData,
    pub token: TokenData,
}

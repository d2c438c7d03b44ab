use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use warden::context::HttpResponseContext;
use warden::AuthenticatorService;

use super::ApiError;
use super::ContextResponse;
use crate::inbound::http::middleware::Identity;
use crate::inbound::http::middleware::WardenRequest;
use crate::inbound::http::router::AppState;

pub async fn sign_out(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    WardenRequest(request): WardenRequest,
) -> Result<ContextResponse<StatusCode>, ApiError> {
    let mut context = HttpResponseContext::for_request(&request);
    state
        .authenticator
        .discard(&identity.authenticator, &mut context)
        .await?;

    tracing::info!(login = %identity.authenticator.login_info, "Signed out");
    Ok(ContextResponse::new(
        StatusCode::NO_CONTENT,
        context,
        state.session_cookie.clone(),
    ))
}

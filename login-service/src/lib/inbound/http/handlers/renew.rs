use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use warden::context::HttpResponseContext;
use warden::AuthenticatorService;

use super::sign_in::TokenData;
use super::ApiError;
use super::ApiSuccess;
use super::ContextResponse;
use crate::inbound::http::middleware::Identity;
use crate::inbound::http::middleware::WardenRequest;
use crate::inbound::http::router::AppState;

/// Swap the current token for a fresh one with a new expiry.
///
/// The old token stops working immediately.
pub async fn renew(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    WardenRequest(request): WardenRequest,
) -> Result<ContextResponse<ApiSuccess<TokenData>>, ApiError> {
    let mut context = HttpResponseContext::for_request(&request);
    let renewed = state
        .authenticator
        .renew(identity.authenticator, &request, &mut context)
        .await?;

    let token = context
        .header(state.authenticator.header_name())
        .map(str::to_string)
        .ok_or_else(|| ApiError::InternalServerError("Authenticator was not stored".to_string()))?;

    Ok(ContextResponse::new(
        ApiSuccess::new(
            StatusCode::OK,
            TokenData {
                token,
                expires_at: renewed.expires_at,
            },
        ),
        context,
        state.session_cookie.clone(),
    ))
}

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use warden::context::HttpRequestContext;
use warden::context::HttpResponseContext;
use warden::providers::Credentials;
use warden::providers::CredentialsProvider;
use warden::AuthenticatorService;
use warden::LoginInfo;

use super::sign_up::AccountData;
use super::ApiError;
use super::ApiSuccess;
use super::ContextResponse;
use crate::domain::account::models::EmailAddress;
use crate::domain::account::ports::AccountServicePort;
use crate::inbound::http::middleware::WardenRequest;
use crate::inbound::http::router::AppState;

pub async fn sign_in(
    State(state): State<AppState>,
    WardenRequest(request): WardenRequest,
    Json(body): Json<SignInRequestBody>,
) -> Result<ContextResponse<ApiSuccess<SignInResponseData>>, ApiError> {
    let email = EmailAddress::new(body.email)
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let account = state
        .account_service
        .sign_in(&Credentials::new(email.as_str(), body.password))
        .await?;

    let mut context = HttpResponseContext::for_request(&request);
    let token = issue_token(
        &state,
        &request,
        CredentialsProvider::login_info(email.as_str()),
        &mut context,
    )
    .await?;

    Ok(ContextResponse::new(
        ApiSuccess::new(
            StatusCode::OK,
            SignInResponseData {
                account: (&account).into(),
                token,
            },
        ),
        context,
        state.session_cookie.clone(),
    ))
}

/// Create a JWT authenticator for `login_info` and embed it in `context`.
pub(crate) async fn issue_token(
    state: &AppState,
    request: &HttpRequestContext,
    login_info: LoginInfo,
    context: &mut HttpResponseContext,
) -> Result<TokenData, ApiError> {
    let authenticator = state.authenticator.create(login_info, request).await?;
    let expires_at = authenticator.expires_at;

    state.authenticator.init(authenticator, context).await?;

    // init leaves the response untouched when the store is down
    let token = context
        .header(state.authenticator.header_name())
        .map(str::to_string)
        .ok_or_else(|| ApiError::InternalServerError("Authenticator was not stored".to_string()))?;

    Ok(TokenData { token, expires_at })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignInRequestBody {
    email: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignInResponseData {
    pub account: AccountData,
    pub token: TokenData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenData {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

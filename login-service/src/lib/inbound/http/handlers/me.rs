use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::sign_up::AccountData;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::account::ports::AccountServicePort;
use crate::inbound::http::middleware::Identity;
use crate::inbound::http::router::AppState;

pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<ApiSuccess<MeResponseData>, ApiError> {
    let authenticator = identity.authenticator;
    let account = state
        .account_service
        .get_account(&authenticator.login_info)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        MeResponseData {
            account: (&account).into(),
            provider_id: authenticator.login_info.provider_id,
            expires_at: authenticator.expires_at,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeResponseData {
    pub account: AccountData,
    /// Provider the current authenticator was issued for
    pub provider_id: String,
    pub expires_at: DateTime<Utc>,
}

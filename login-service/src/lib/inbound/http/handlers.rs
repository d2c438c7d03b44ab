use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use warden::context::HttpResponseContext;
use warden::context::SessionCookie;
use warden::providers::OAuth2Error;
use warden::providers::StateError;
use warden::AuthenticatorError;

use crate::account::errors::AccountError;

pub mod me;
pub mod oauth2;
pub mod renew;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// Marks a response whose authenticator carrier the handler already wrote.
///
/// The authentication middleware leaves such responses alone instead of
/// persisting the request's authenticator again.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatorHandled;

/// Response carrying the headers, cookies and session changes recorded in a
/// [`HttpResponseContext`].
pub struct ContextResponse<T> {
    inner: T,
    context: HttpResponseContext,
    session_cookie: Arc<SessionCookie>,
}

impl<T: IntoResponse> ContextResponse<T> {
    pub fn new(inner: T, context: HttpResponseContext, session_cookie: Arc<SessionCookie>) -> Self {
        Self {
            inner,
            context,
            session_cookie,
        }
    }
}

impl<T: IntoResponse> IntoResponse for ContextResponse<T> {
    fn into_response(self) -> Response {
        let mut response = self.inner.into_response();
        self.context
            .apply(&self.session_cookie, response.headers_mut());
        response.extensions_mut().insert(AuthenticatorHandled);
        response
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    BadGateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound(_) => ApiError::NotFound(err.to_string()),
            AccountError::EmailAlreadyExists(_) => ApiError::Conflict(err.to_string()),
            AccountError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AccountError::InvalidDisplayName(_)
            | AccountError::InvalidEmail(_)
            | AccountError::InvalidPassword(_)
            | AccountError::IncompleteProfile(_) => ApiError::UnprocessableEntity(err.to_string()),
            AccountError::CredentialStorage(_) | AccountError::Unknown(_) => {
                ApiError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<AuthenticatorError> for ApiError {
    fn from(err: AuthenticatorError) -> Self {
        tracing::error!(error = %err, cause = %err.cause, "Authenticator operation failed");
        ApiError::InternalServerError(err.to_string())
    }
}

impl From<OAuth2Error> for ApiError {
    fn from(err: OAuth2Error) -> Self {
        match err {
            OAuth2Error::AccessDenied { .. } => ApiError::Unauthorized(err.to_string()),
            OAuth2Error::State(StateError::Serialization(_)) => {
                ApiError::InternalServerError(err.to_string())
            }
            OAuth2Error::Provider { .. } | OAuth2Error::State(_) => {
                ApiError::BadRequest(err.to_string())
            }
            OAuth2Error::AccessToken { .. }
            | OAuth2Error::InvalidTokenResponse { .. }
            | OAuth2Error::ProfileRequest { .. }
            | OAuth2Error::Profile(_) => ApiError::BadGateway(err.to_string()),
            OAuth2Error::StateGeneration { .. } => ApiError::InternalServerError(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}

use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::State;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use warden::context::HttpRequestContext;
use warden::context::HttpResponseContext;
use warden::Authenticator;

use super::handlers::ApiError;
use super::handlers::AuthenticatorHandled;
use crate::inbound::http::router::AppState;

/// Extension type to store the valid authenticator of the current request
#[derive(Debug, Clone)]
pub struct Identity {
    pub authenticator: Authenticator,
}

/// Request capabilities for the authenticators and providers.
pub struct WardenRequest(pub HttpRequestContext);

#[async_trait]
impl FromRequestParts<AppState> for WardenRequest {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(HttpRequestContext::from_parts(parts, &state.session_cookie)))
    }
}

/// Middleware that retrieves and checks the request's authenticator.
///
/// A valid authenticator is touched and attached as [`Identity`]; an expired
/// or idle one is discarded and the request rejected. After the handler ran,
/// a touched authenticator is persisted and its carrier refreshed, unless the
/// handler already wrote a carrier itself.
pub async fn authenticate(
    State(state): State<AppState>,
    WardenRequest(request): WardenRequest,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let mut context = HttpResponseContext::for_request(&request);

    let Some(authenticated) = state.guard.authenticate(&request, &mut context).await? else {
        tracing::debug!(uri = %req.uri(), "Rejecting request without valid authenticator");
        let mut response =
            ApiError::Unauthorized("Missing or invalid authenticator".to_string()).into_response();
        context.apply(&state.session_cookie, response.headers_mut());
        return Ok(response);
    };

    req.extensions_mut().insert(Identity {
        authenticator: authenticated.authenticator.clone(),
    });

    let mut response = next.run(req).await;
    if response.extensions().get::<AuthenticatorHandled>().is_some() {
        return Ok(response);
    }

    state.guard.finish(authenticated, &mut context).await?;
    context.apply(&state.session_cookie, response.headers_mut());
    Ok(response)
}

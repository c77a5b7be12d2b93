//! Route protection middleware.
//!
//! Every protected route is wrapped with the gateway pipeline under its
//! registered route name. On success the resolved [`AuthContext`] is inserted
//! as a request extension; handlers pull it out with the [`Auth`] extractor.

use axum::extract::{FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;

use stratboard_gateway::AuthContext;

use crate::error::ApiError;
use crate::state::AppState;

/// Registry name this deployment authenticates under.
pub const SERVICE_NAME: &str = "api.auth";

/// Wrap a method router with the authentication pipeline for `route`, the
/// name the route is registered under in the authorization registry.
pub fn protected(
    state: &AppState,
    route: &'static str,
    routes: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    let state = state.clone();
    routes.layer(axum::middleware::from_fn(
        move |request: Request, next: Next| {
            let state = state.clone();
            async move { authenticate_request(state, route, request, next).await }
        },
    ))
}

async fn authenticate_request(
    state: AppState,
    route: &'static str,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(&request);

    match state
        .gateway
        .authenticate(token.as_deref(), SERVICE_NAME, route)
        .await
    {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(route, error = %err, "authentication rejected");
            ApiError::from(err).into_response()
        }
    }
}

fn bearer_token(request: &Request) -> Option<String> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    header
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

/// Extractor for the authentication context inserted by [`protected`].
/// Using it on an unprotected route is a wiring bug and yields a 500.
pub struct Auth(pub AuthContext);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(Auth)
            .ok_or_else(|| {
                tracing::error!("Auth extractor used on a route without the auth layer");
                ApiError::Internal
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn request_with_auth(value: &str) -> Request {
        let mut request = Request::new(axum::body::Body::empty());
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        request
    }

    #[test]
    fn bearer_token_strips_scheme() {
        let request = request_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&request).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn non_bearer_scheme_is_ignored() {
        let request = request_with_auth("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&request), None);
    }

    #[test]
    fn missing_header_yields_none() {
        let request = Request::new(axum::body::Body::empty());
        assert_eq!(bearer_token(&request), None);
    }
}

//! Authentication and authorization.
//!
//! [`authenticate`] runs on every dynamic-chain request and decides, fresh
//! each time, whether the request is authenticated. The answer travels to
//! handlers and to [`require_authentication`] as a [`RequestContext`] in the
//! request extensions.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, header::CACHE_CONTROL, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::session::SessionHandle;
use crate::error::{Result, set_sentry_user};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Where unauthenticated visitors to protected routes are sent.
pub const LOGIN_PATH: &str = "/user/login";

/// Per-request authentication state.
///
/// Only [`authenticate`] constructs an authenticated context, and only after
/// confirming the session's user still exists. Everything downstream reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    is_authenticated: bool,
}

impl RequestContext {
    /// A request with no verified identity.
    pub const ANONYMOUS: Self = Self {
        is_authenticated: false,
    };

    const AUTHENTICATED: Self = Self {
        is_authenticated: true,
    };

    /// Whether the request carries a verified identity.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        self.is_authenticated
    }
}

/// Reads the context set by [`authenticate`]. Routes outside the dynamic
/// chain see an anonymous context.
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .copied()
            .unwrap_or(Self::ANONYMOUS))
    }
}

/// Work out the authentication state for the current session.
///
/// An absent or zero user ID is anonymous and never touches the user store.
/// A stored ID counts only if the user still exists; a user deleted since
/// login leaves the request anonymous but the session untouched.
///
/// # Errors
///
/// A store failure is an error, not an anonymous request: an outage must not
/// look like a logout.
pub async fn resolve_request_context(
    auth: &AuthService<'_>,
    session: &SessionHandle,
) -> Result<RequestContext> {
    let Some(user_id) = session.authenticated_user_id().await? else {
        return Ok(RequestContext::ANONYMOUS);
    };

    if auth.exists(user_id).await? {
        set_sentry_user(&user_id);
        Ok(RequestContext::AUTHENTICATED)
    } else {
        tracing::debug!(%user_id, "Session refers to a user that no longer exists");
        Ok(RequestContext::ANONYMOUS)
    }
}

/// Middleware that attaches a [`RequestContext`] to the request.
///
/// # Errors
///
/// Returns an error (rendered as 500) if the session or user store fails.
pub async fn authenticate(
    State(state): State<AppState>,
    session: SessionHandle,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let context = resolve_request_context(&state.auth(), &session).await?;
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Gate for protected routes.
///
/// Anonymous requests are redirected (303) to the login page without the
/// handler running. Authorized responses are marked `Cache-Control: no-store`.
pub async fn require_authentication(
    context: RequestContext,
    request: Request,
    next: Next,
) -> Response {
    if !context.is_authenticated() {
        return Redirect::to(LOGIN_PATH).into_response();
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

//! CSRF protection using the double-submit pattern.
//!
//! Each session holds one random token (stored under
//! [`keys::CSRF_TOKEN`]). The token is mirrored to the client in the
//! `csrf_token` cookie and embedded in every rendered form. A state-changing
//! request must present it twice: in the cookie, and in either the
//! `X-CSRF-Token` header or the `csrf_token` form field. Both copies are
//! compared in constant time against the session's token.
//!
//! The token is stable for the life of a session. [`SessionHandle::renew_token`]
//! drops it, and this middleware issues a replacement for the new session
//! before the response leaves.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use subtle::ConstantTimeEq;
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

use super::session::{SESSION_LIFETIME_SECONDS, SessionHandle, keys};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Cookie carrying the client's copy of the token.
pub const CSRF_COOKIE_NAME: &str = "csrf_token";

/// Form field carrying the submitted token.
pub const CSRF_FORM_FIELD: &str = "csrf_token";

/// Header carrying the submitted token (for non-form clients).
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Random bytes per token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Largest form body buffered while looking for the token.
const MAX_FORM_BYTES: usize = 1024 * 1024;

/// The session's CSRF token, for embedding in forms.
#[derive(Clone, Debug)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Get the token value for use in templates.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            tracing::warn!(
                "CSRF token not found in request extensions - middleware may be misconfigured"
            );
            Self(String::new())
        }))
    }
}

/// Middleware that issues and verifies CSRF tokens.
///
/// Must run inside the session layer. Safe methods (GET, HEAD, OPTIONS,
/// TRACE) are never checked, but a session without a token gets one so the
/// page being rendered can embed it. Every other method is rejected with 400
/// before reaching the handler unless the token checks out.
///
/// # Errors
///
/// Returns `AppError::BadRequest` on a missing or mismatched token and
/// `AppError::Session` if the session store fails.
pub async fn csrf_middleware(
    State(state): State<AppState>,
    session: SessionHandle,
    request: Request,
    next: Next,
) -> Result<Response> {
    let cookie_token = read_cookie(request.headers(), CSRF_COOKIE_NAME);
    let session_token: Option<String> = session.get(keys::CSRF_TOKEN).await?;

    let (mut request, token) = if request.method().is_safe() {
        let token = match session_token {
            Some(token) => token,
            None => issue_token(&session).await?,
        };
        (request, token)
    } else {
        let Some(expected) = session_token else {
            tracing::warn!(method = %request.method(), "CSRF check failed: session has no token");
            return Err(AppError::BadRequest("missing CSRF token".to_owned()));
        };

        let (request, submitted) = submitted_token(request).await?;
        let cookie_ok = cookie_token
            .as_deref()
            .is_some_and(|cookie| tokens_match(&expected, cookie));
        let submitted_ok = submitted
            .as_deref()
            .is_some_and(|submitted| tokens_match(&expected, submitted));

        if !(cookie_ok && submitted_ok) {
            tracing::warn!(
                method = %request.method(),
                cookie_present = cookie_token.is_some(),
                submitted_present = submitted.is_some(),
                "CSRF check failed: token mismatch"
            );
            return Err(AppError::BadRequest("invalid CSRF token".to_owned()));
        }

        (request, expected)
    };

    request.extensions_mut().insert(CsrfToken(token));
    let mut response = next.run(request).await;

    // The handler may have renewed the session, which drops the token
    let current = match session.get::<String>(keys::CSRF_TOKEN).await? {
        Some(token) => token,
        None => issue_token(&session).await?,
    };

    if cookie_token.as_deref() != Some(current.as_str()) {
        let cookie = Cookie::build((CSRF_COOKIE_NAME, current))
            .path("/")
            .http_only(true)
            .secure(state.config().secure_cookies)
            .same_site(SameSite::Lax)
            .max_age(Duration::seconds(SESSION_LIFETIME_SECONDS))
            .build();
        let value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| AppError::Internal(format!("invalid CSRF cookie: {e}")))?;
        response.headers_mut().append(SET_COOKIE, value);
    }

    Ok(response)
}

/// Generate a new random token.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare two tokens in constant time.
#[must_use]
pub fn tokens_match(expected: &str, candidate: &str) -> bool {
    expected.as_bytes().ct_eq(candidate.as_bytes()).into()
}

async fn issue_token(session: &SessionHandle) -> Result<String> {
    let token = generate_token();
    session.put(keys::CSRF_TOKEN, &token).await?;
    Ok(token)
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(std::result::Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
}

/// Pull the submitted token from the header or the urlencoded form body.
///
/// The body is buffered and put back so the handler can still read it.
async fn submitted_token(request: Request) -> Result<(Request, Option<String>)> {
    if let Some(token) = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
    {
        return Ok((request, Some(token)));
    }

    if !is_urlencoded_form(request.headers()) {
        return Ok((request, None));
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("unreadable form body: {e}")))?;
    let token = url::form_urlencoded::parse(&bytes)
        .find(|(key, _)| key == CSRF_FORM_FIELD)
        .map(|(_, value)| value.into_owned());

    Ok((Request::from_parts(parts, Body::from(bytes)), token))
}

fn is_urlencoded_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

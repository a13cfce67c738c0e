//! HTTP middleware stack.
//!
//! # Standard chain (every request, outermost first)
//!
//! 1. Panic recovery (`CatchPanicLayer` + [`RecoverPanic`])
//! 2. Sentry layers (hub per request, HTTP transaction)
//! 3. `TraceLayer` (one span and one log line per request)
//! 4. Request ID
//! 5. Security headers
//!
//! # Dynamic chain (application pages, outermost first)
//!
//! 1. Session load/save (tower-sessions)
//! 2. Deferred session ID renewal
//! 3. CSRF double-submit check
//! 4. Authentication ([`RequestContext`])
//!
//! Protected routes add the authorization gate as a route layer, so it only
//! runs once a route has matched.

pub mod auth;
pub mod csrf;
pub mod recover;
pub mod request_id;
pub mod security_headers;
pub mod session;

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router,
    extract::{ConnectInfo, Request},
    middleware::{from_fn, from_fn_with_state},
    response::Response,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tower_sessions::SessionStore;
use tracing::Span;

use crate::config::AppConfig;
use crate::state::AppState;

pub use auth::{RequestContext, authenticate, require_authentication};
pub use csrf::{CsrfToken, csrf_middleware};
pub use recover::RecoverPanic;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{SessionHandle, create_session_layer, session_renewal_middleware};

/// Wrap a fully-routed app in the standard chain.
#[must_use]
pub fn with_standard_chain(router: Router, config: &AppConfig) -> Router {
    router
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip().to_string());
                    tracing::info_span!(
                        "http_request",
                        ip = ip.as_deref().unwrap_or("-"),
                        proto = ?request.version(),
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &Request, _span: &Span| {
                    tracing::info!("received request");
                })
                .on_response(|response: &Response, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .layer(sentry_tower::NewSentryLayer::<Request>::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
        .layer(CatchPanicLayer::custom(RecoverPanic::new(config.debug)))
}

/// Wrap application routes in the dynamic chain.
///
/// The session store is a parameter so tests can run the real chain over
/// `MemoryStore`.
#[must_use]
pub fn with_dynamic_chain<Store>(
    router: Router<AppState>,
    state: &AppState,
    store: Store,
) -> Router<AppState>
where
    Store: SessionStore + Clone,
{
    router
        .layer(from_fn_with_state(state.clone(), authenticate))
        .layer(from_fn_with_state(state.clone(), csrf_middleware))
        .layer(from_fn(session_renewal_middleware))
        .layer(create_session_layer(store, state.config()))
}

/// Put routes behind the authorization gate.
#[must_use]
pub fn with_authorization_gate(router: Router<AppState>) -> Router<AppState> {
    router.route_layer(from_fn(require_authentication))
}

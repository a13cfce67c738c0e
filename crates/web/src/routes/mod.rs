//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! /ping                    - Liveness check (standard chain only)
//! /static/*                - CSS and other assets (standard chain only)
//! /                        - Latest snippets
//! /about                   - About page
//! /snippet/view/{id}       - Single snippet
//! /user/signup             - Signup form (GET) / create account (POST)
//! /user/login              - Login form (GET) / authenticate (POST)
//! /snippet/create          - Create form (GET) / create snippet (POST), protected
//! /user/logout             - Logout (POST), protected
//! ```

pub mod pages;
pub mod snippets;
pub mod users;

use axum::{
    Form, Router,
    extract::rejection::FormRejection,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_sessions::SessionStore;

use crate::error::{AppError, Result};
use crate::middleware::{with_authorization_gate, with_dynamic_chain, with_standard_chain};
use crate::state::AppState;

/// Directory served under `/static`.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the complete application.
#[must_use]
pub fn router<Store>(state: AppState, sessions: Store) -> Router
where
    Store: SessionStore + Clone,
{
    compose(state, sessions, Router::new(), Router::new())
}

/// Build the application with extra routes mounted in the dynamic chain
/// (`dynamic`) and behind the authorization gate (`protected`).
#[must_use]
pub fn compose<Store>(
    state: AppState,
    sessions: Store,
    dynamic: Router<AppState>,
    protected: Router<AppState>,
) -> Router
where
    Store: SessionStore + Clone,
{
    let config = state.config().clone();

    let protected = with_authorization_gate(protected_routes().merge(protected));
    let app = with_dynamic_chain(
        dynamic_routes().merge(dynamic).merge(protected),
        &state,
        sessions,
    );

    let router = Router::new()
        .route("/ping", get(pages::ping))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .merge(app)
        .fallback(pages::not_found)
        .with_state(state);

    with_standard_chain(router, &config)
}

/// Pages open to everyone.
fn dynamic_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/about", get(pages::about))
        .route("/snippet/view/{id}", get(snippets::view))
        .route("/user/signup", get(users::signup_page).post(users::signup))
        .route("/user/login", get(users::login_page).post(users::login))
}

/// Pages that need an authenticated user.
fn protected_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/snippet/create",
            get(snippets::create_page).post(snippets::create),
        )
        .route("/user/logout", post(users::logout))
}

/// Unwrap a decoded form, turning a decode failure into 400.
pub(crate) fn parse_form<T>(form: std::result::Result<Form<T>, FormRejection>) -> Result<T> {
    form.map(|Form(form)| form)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

//! Panic recovery through the full middleware stack.

#![allow(clippy::unwrap_used)]

use axum::{Router, http::StatusCode, routing::get};

use snippetbox_integration_tests::{SESSION_COOKIE, TestContext};
use snippetbox_web::config::AppConfig;
use snippetbox_web::middleware::session::keys;
use snippetbox_web::state::AppState;
use snippetbox_web::views::ViewContext;

const LOST_FLASH: &str = "This notice must never be shown";
const EMAIL: &str = "alice@example.com";
const PASSWORD: &str = "pa$$word";

async fn faulty(view: ViewContext) -> &'static str {
    view.session().put(keys::FLASH, LOST_FLASH).await.unwrap();
    panic!("oops! something went wrong")
}

async fn faulty_renewal(view: ViewContext) -> &'static str {
    view.session().renew_token().await.unwrap();
    view.session().put(keys::FLASH, LOST_FLASH).await.unwrap();
    panic!("failed after renewing the session")
}

async fn context(debug: bool) -> TestContext {
    let config = AppConfig {
        debug,
        ..AppConfig::default()
    };
    let dynamic: Router<AppState> = Router::new().route("/faulty", get(faulty));
    let protected: Router<AppState> = Router::new()
        .route("/account/faulty", get(faulty))
        .route("/account/renew", get(faulty_renewal));
    TestContext::build(config, dynamic, protected).await
}

#[tokio::test]
async fn test_panic_becomes_500_and_closes_connection() {
    let ctx = context(false).await;

    let response = ctx.get("/faulty").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.header("connection"), Some("close"));
    assert_eq!(response.body, "Internal Server Error");
    assert_eq!(response.header("x-frame-options"), Some("deny"));
    assert_eq!(response.header("referer-policy"), Some("origin-when-cross-origin"));
}

#[tokio::test]
async fn test_session_writes_are_discarded_on_panic() {
    let ctx = context(false).await;
    // Start a session first so the handler has something to write into
    ctx.get("/").await;

    let response = ctx.get("/faulty").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    let home = ctx.get("/").await;
    assert_eq!(home.status, StatusCode::OK);
    assert!(!home.body.contains(LOST_FLASH));
}

#[tokio::test]
async fn test_debug_mode_shows_panic_message() {
    let ctx = context(true).await;

    let response = ctx.get("/faulty").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body.contains("oops! something went wrong"));
}

#[tokio::test]
async fn test_server_keeps_serving_after_panic() {
    let ctx = context(false).await;

    ctx.get("/faulty").await;
    let response = ctx.get("/snippet/view/1").await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_panic_keeps_user_logged_in() {
    let ctx = context(false).await;
    ctx.signup_and_login(EMAIL, PASSWORD).await;
    let session = ctx.cookie(SESSION_COOKIE).unwrap();

    let response = ctx.get("/account/faulty").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.header("set-cookie").is_none());

    assert_eq!(ctx.cookie(SESSION_COOKIE).unwrap(), session);
    let home = ctx.get("/").await;
    assert!(!home.body.contains(LOST_FLASH));
    assert_eq!(ctx.get("/snippet/create").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_session_renewal_is_discarded_on_panic() {
    let ctx = context(false).await;
    ctx.signup_and_login(EMAIL, PASSWORD).await;
    let session = ctx.cookie(SESSION_COOKIE).unwrap();

    let response = ctx.get("/account/renew").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.header("set-cookie").is_none());

    assert_eq!(ctx.cookie(SESSION_COOKIE).unwrap(), session);
    assert_eq!(ctx.get("/snippet/create").await.status, StatusCode::OK);
    assert!(!ctx.get("/").await.body.contains(LOST_FLASH));
}

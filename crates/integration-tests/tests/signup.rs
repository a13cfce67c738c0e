//! Account signup.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use snippetbox_integration_tests::{
    CSRF_COOKIE, SESSION_COOKIE, TestContext, TestResponse, extract_csrf_token,
};

const VALID_NAME: &str = "Bob";
const VALID_PASSWORD: &str = "validPa$$word";
const VALID_EMAIL: &str = "bob@example.com";

#[tokio::test]
async fn test_signup_form_has_csrf_token() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/user/signup").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("<form action='/user/signup' method='POST' novalidate>"));
    let token = extract_csrf_token(&response.body).unwrap();
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_signup_success_redirects_to_login() {
    let ctx = TestContext::new().await;

    let response = ctx.signup(VALID_NAME, VALID_EMAIL, VALID_PASSWORD).await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/user/login"));
    assert_eq!(ctx.users.count_by_email(VALID_EMAIL).await, 1);

    let login = ctx.get("/user/login").await;
    assert!(login.body.contains("User signed up successfully"));
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let ctx = TestContext::new().await;
    ctx.signup(VALID_NAME, "dupe@example.com", VALID_PASSWORD)
        .await;

    let response = ctx
        .signup("Someone Else", "dupe@example.com", VALID_PASSWORD)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("value='Someone Else'"));
    assert!(response.body.contains("Email address is already in use"));
    assert_eq!(ctx.users.count_by_email("dupe@example.com").await, 1);
}

#[tokio::test]
async fn test_signup_validation() {
    let ctx = TestContext::new().await;

    let cases = [
        ("", VALID_EMAIL, VALID_PASSWORD, "This field cannot be blank"),
        (VALID_NAME, "", VALID_PASSWORD, "This field cannot be blank"),
        (VALID_NAME, VALID_EMAIL, "", "This field cannot be blank"),
        (VALID_NAME, "bob@", VALID_PASSWORD, "This field must be a valid email address"),
        (VALID_NAME, "bob.example.com", VALID_PASSWORD, "This field must be a valid email address"),
        (VALID_NAME, VALID_EMAIL, "pa$$", "This field must be at least 8 characters long"),
    ];

    for (name, email, password, message) in cases {
        let response = ctx.signup(name, email, password).await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY, "{message}");
        assert!(response.body.contains(message), "{message}");
    }

    assert_eq!(ctx.users.count_by_email(VALID_EMAIL).await, 0);
}

#[tokio::test]
async fn test_signup_form_keeps_entered_values() {
    let ctx = TestContext::new().await;

    let response = ctx.signup("Carol", "carol@example.com", "short").await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("value='Carol'"));
    assert!(response.body.contains("value='carol@example.com'"));
    assert!(!response.body.contains("short"));
}

#[tokio::test]
async fn test_signup_without_csrf_token_is_rejected() {
    let ctx = TestContext::new().await;
    // Establish a session and CSRF cookie, then omit the form field
    let token = ctx.csrf_token("/user/signup").await;
    let session = ctx.cookie(SESSION_COOKIE).unwrap();

    let response = ctx
        .post_form(
            "/user/signup",
            &[
                ("name", VALID_NAME),
                ("email", VALID_EMAIL),
                ("password", VALID_PASSWORD),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(ctx.users.count_by_email(VALID_EMAIL).await, 0);
    assert_session_untouched(&ctx, &response, &session, &token).await;
}

#[tokio::test]
async fn test_signup_with_wrong_csrf_token_is_rejected() {
    let ctx = TestContext::new().await;
    let token = ctx.csrf_token("/user/signup").await;
    let session = ctx.cookie(SESSION_COOKIE).unwrap();

    let response = ctx
        .post_form(
            "/user/signup",
            &[
                ("name", VALID_NAME),
                ("email", VALID_EMAIL),
                ("password", VALID_PASSWORD),
                ("csrf_token", "wrongToken"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(ctx.users.count_by_email(VALID_EMAIL).await, 0);
    assert_session_untouched(&ctx, &response, &session, &token).await;
}

#[tokio::test]
async fn test_signup_without_session_is_rejected() {
    let ctx = TestContext::new().await;
    let token = ctx.csrf_token("/user/signup").await;
    ctx.clear_cookies();

    let response = ctx
        .post_form(
            "/user/signup",
            &[
                ("name", VALID_NAME),
                ("email", VALID_EMAIL),
                ("password", VALID_PASSWORD),
                ("csrf_token", token.as_str()),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(ctx.users.count_by_email(VALID_EMAIL).await, 0);
    assert!(response.header("set-cookie").is_none());
    assert_eq!(ctx.cookie(SESSION_COOKIE), None);
}

/// A rejected POST must leave the session exactly as it was: no cookies
/// issued, same session ID, same CSRF token, no flash queued.
async fn assert_session_untouched(
    ctx: &TestContext,
    response: &TestResponse,
    session: &str,
    token: &str,
) {
    assert!(response.header("set-cookie").is_none());
    assert_eq!(ctx.cookie(SESSION_COOKIE).as_deref(), Some(session));
    assert_eq!(ctx.cookie(CSRF_COOKIE).as_deref(), Some(token));

    let page = ctx.get("/user/signup").await;
    assert_eq!(extract_csrf_token(&page.body).as_deref(), Some(token));
    assert!(!page.body.contains("class='flash'"));
}

//! Standard-chain behaviour shared by every response.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use snippetbox_integration_tests::{SESSION_COOKIE, TestContext};

const EXPECTED_HEADERS: [(&str, &str); 6] = [
    (
        "content-security-policy",
        "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com",
    ),
    ("referer-policy", "origin-when-cross-origin"),
    ("referrer-policy", "origin-when-cross-origin"),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "deny"),
    ("x-xss-protection", "0"),
];

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let ctx = TestContext::new().await;

    for (path, status) in [
        ("/", StatusCode::OK),
        ("/ping", StatusCode::OK),
        ("/static/css/main.css", StatusCode::OK),
        ("/missing", StatusCode::NOT_FOUND),
        ("/snippet/create", StatusCode::SEE_OTHER),
    ] {
        let response = ctx.get(path).await;
        assert_eq!(response.status, status, "GET {path}");
        for (name, value) in EXPECTED_HEADERS {
            assert_eq!(response.header(name), Some(value), "{name} on GET {path}");
        }
        assert!(response.header("x-request-id").is_some(), "GET {path}");
    }
}

#[tokio::test]
async fn test_ping_skips_the_dynamic_chain() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/ping").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "OK");
    assert!(response.header("set-cookie").is_none());
    assert_eq!(ctx.cookie(SESSION_COOKIE), None);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/no/such/page").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body, "Not Found");
}

#[tokio::test]
async fn test_about_page() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/about").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("About"));
}

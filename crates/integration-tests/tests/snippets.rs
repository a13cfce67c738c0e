//! Snippet pages.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use chrono::{Duration, Utc};

use snippetbox_integration_tests::{SEED_TITLE, TestContext};

#[tokio::test]
async fn test_home_lists_latest_snippets() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Latest Snippets"));
    assert!(response.body.contains(SEED_TITLE));
    assert!(response.body.contains("/snippet/view/1"));
}

#[tokio::test]
async fn test_view_snippet() {
    let ctx = TestContext::new().await;

    let cases = [
        ("/snippet/view/1", StatusCode::OK, Some("An old silent pond...")),
        ("/snippet/view/2", StatusCode::NOT_FOUND, None),
        ("/snippet/view/509", StatusCode::NOT_FOUND, None),
        ("/snippet/view/-1", StatusCode::NOT_FOUND, None),
        ("/snippet/view/0", StatusCode::NOT_FOUND, None),
        ("/snippet/view/1.23", StatusCode::NOT_FOUND, None),
        ("/snippet/view/foo", StatusCode::NOT_FOUND, None),
        ("/snippet/view/", StatusCode::NOT_FOUND, None),
    ];

    for (path, status, body) in cases {
        let response = ctx.get(path).await;
        assert_eq!(response.status, status, "GET {path}");
        if let Some(body) = body {
            assert!(response.body.contains(body), "GET {path}");
        }
    }
}

#[tokio::test]
async fn test_expired_snippet_is_not_found() {
    let ctx = TestContext::new().await;
    let id = ctx
        .snippets
        .insert_expiring_at("Gone", "Already expired", Utc::now() - Duration::seconds(1))
        .await
        .unwrap();

    let response = ctx.get(&format!("/snippet/view/{id}")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let home = ctx.get("/").await;
    assert!(!home.body.contains("Gone"));
}

#[tokio::test]
async fn test_create_form_defaults_to_one_year() {
    let ctx = TestContext::new().await;
    ctx.signup_and_login("alice@example.com", "pa$$word").await;

    let response = ctx.get("/snippet/create").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("<form action='/snippet/create' method='POST'>"));
    assert!(response.body.contains("value='365' checked"));
}

#[tokio::test]
async fn test_create_snippet() {
    let ctx = TestContext::new().await;
    ctx.signup_and_login("alice@example.com", "pa$$word").await;
    let token = ctx.csrf_token("/snippet/create").await;

    let response = ctx
        .post_form(
            "/snippet/create",
            &[
                ("title", "O snail"),
                ("content", "O snail\nClimb Mount Fuji,\nBut slowly, slowly!"),
                ("expires", "7"),
                ("csrf_token", token.as_str()),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/snippet/view/2"));

    let page = ctx.get("/snippet/view/2").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Snippet successfully created!"));
    assert!(page.body.contains("O snail"));

    // Flash is shown once
    let again = ctx.get("/snippet/view/2").await;
    assert!(!again.body.contains("Snippet successfully created!"));
}

#[tokio::test]
async fn test_create_snippet_validation() {
    let ctx = TestContext::new().await;
    ctx.signup_and_login("alice@example.com", "pa$$word").await;
    let token = ctx.csrf_token("/snippet/create").await;
    let long_title = "a".repeat(101);

    let cases = [
        ("", "content", "7", "This field cannot be blank"),
        (long_title.as_str(), "content", "7", "This field cannot be more than 100 characters long"),
        ("title", "   ", "7", "This field cannot be blank"),
        ("title", "content", "30", "This field must equal 1, 7 or 365"),
    ];

    for (title, content, expires, message) in cases {
        let response = ctx
            .post_form(
                "/snippet/create",
                &[
                    ("title", title),
                    ("content", content),
                    ("expires", expires),
                    ("csrf_token", token.as_str()),
                ],
            )
            .await;

        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY, "{message}");
        assert!(response.body.contains(message), "{message}");
    }

    assert_eq!(ctx.snippets.len().await, 1);
}

#[tokio::test]
async fn test_create_snippet_malformed_expires_is_bad_request() {
    let ctx = TestContext::new().await;
    ctx.signup_and_login("alice@example.com", "pa$$word").await;
    let token = ctx.csrf_token("/snippet/create").await;

    for expires in [None, Some("soon")] {
        let mut fields = vec![
            ("title", "t"),
            ("content", "c"),
            ("csrf_token", token.as_str()),
        ];
        if let Some(expires) = expires {
            fields.push(("expires", expires));
        }

        let response = ctx.post_form("/snippet/create", &fields).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{expires:?}");
    }

    assert_eq!(ctx.snippets.len().await, 1);
}

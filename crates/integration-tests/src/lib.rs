//! End-to-end tests for Snippetbox.
//!
//! Tests drive the same router production serves, in process, with memory
//! stores standing in for `PostgreSQL`. [`TestContext`] carries cookies
//! between requests the way a browser would, so session and CSRF behaviour
//! is exercised for real.
//!
//! ```bash
//! cargo test -p snippetbox-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::{LazyLock, Mutex};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        HeaderMap, Method, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
};
use regex::Regex;
use tower::ServiceExt;
use tower_sessions::{
    MemoryStore,
    cookie::{Cookie, CookieJar, time::OffsetDateTime},
};

use snippetbox_core::SnippetLifetime;
use snippetbox_web::config::AppConfig;
use snippetbox_web::db::SnippetStore;
use snippetbox_web::db::memory::{MemorySnippetStore, MemoryUserStore};
use snippetbox_web::routes;
use snippetbox_web::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Name of the CSRF cookie.
pub const CSRF_COOKIE: &str = "csrf_token";

/// Title of the snippet every context starts with (ID 1).
pub const SEED_TITLE: &str = "An old silent pond";

static CSRF_FIELD_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"name='csrf_token' value='([^']+)'").unwrap());

/// A response with its body read.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header, for redirects.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// A response header as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The application plus a browser-like cookie jar.
pub struct TestContext {
    router: Router,
    pub snippets: MemorySnippetStore,
    pub users: MemoryUserStore,
    jar: Mutex<CookieJar>,
}

impl TestContext {
    /// The full application over fresh memory stores, seeded with one snippet.
    pub async fn new() -> Self {
        Self::build(AppConfig::default(), Router::new(), Router::new()).await
    }

    /// The application with extra routes mounted in the dynamic chain and
    /// behind the authorization gate.
    pub async fn build(
        config: AppConfig,
        dynamic: Router<AppState>,
        protected: Router<AppState>,
    ) -> Self {
        let snippets = MemorySnippetStore::new();
        let users = MemoryUserStore::new();

        snippets
            .insert(
                SEED_TITLE,
                "An old silent pond...\nA frog jumps into the pond,\nsplash! Silence again.",
                SnippetLifetime::Year,
            )
            .await
            .unwrap();

        let state = AppState::new(config, snippets.clone(), users.clone());
        let router = routes::compose(state, MemoryStore::default(), dynamic, protected);

        Self {
            router,
            snippets,
            users,
            jar: Mutex::new(CookieJar::new()),
        }
    }

    /// Send a request with the jar's cookies, then update the jar.
    pub async fn send(&self, mut request: Request<Body>) -> TestResponse {
        if let Some(cookies) = self.cookie_header() {
            request
                .headers_mut()
                .insert(COOKIE, cookies.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        self.store_cookies(&headers);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    /// GET `path`.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::get(path).body(Body::empty()).unwrap())
            .await
    }

    /// POST a urlencoded form to `path`.
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Current value of a cookie in the jar.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.jar
            .lock()
            .unwrap()
            .get(name)
            .map(|cookie| cookie.value().to_owned())
    }

    /// Put a cookie in the jar, replacing any previous value.
    pub fn set_cookie(&self, name: &str, value: &str) {
        self.jar
            .lock()
            .unwrap()
            .add((name.to_owned(), value.to_owned()));
    }

    /// Drop every cookie, as if the browser was closed.
    pub fn clear_cookies(&self) {
        *self.jar.lock().unwrap() = CookieJar::new();
    }

    /// GET `path` and pull the CSRF token out of its form.
    pub async fn csrf_token(&self, path: &str) -> String {
        let page = self.get(path).await;
        assert_eq!(page.status, StatusCode::OK, "GET {path}");
        extract_csrf_token(&page.body).unwrap()
    }

    /// Submit the signup form.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> TestResponse {
        let token = self.csrf_token("/user/signup").await;
        self.post_form(
            "/user/signup",
            &[
                ("name", name),
                ("email", email),
                ("password", password),
                ("csrf_token", token.as_str()),
            ],
        )
        .await
    }

    /// Submit the login form.
    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        let token = self.csrf_token("/user/login").await;
        self.post_form(
            "/user/login",
            &[
                ("email", email),
                ("password", password),
                ("csrf_token", token.as_str()),
            ],
        )
        .await
    }

    /// Sign up and log in a fresh user, asserting both succeed.
    pub async fn signup_and_login(&self, email: &str, password: &str) {
        let signup = self.signup("Alice", email, password).await;
        assert_eq!(signup.status, StatusCode::SEE_OTHER, "{}", signup.body);
        let login = self.login(email, password).await;
        assert_eq!(login.status, StatusCode::SEE_OTHER, "{}", login.body);
    }

    /// Submit the logout form found on the home page.
    pub async fn logout(&self) -> TestResponse {
        let token = self.csrf_token("/").await;
        self.post_form("/user/logout", &[("csrf_token", token.as_str())])
            .await
    }

    fn cookie_header(&self) -> Option<String> {
        let jar = self.jar.lock().unwrap();
        let pairs: Vec<String> = jar
            .iter()
            .map(|cookie| cookie.stripped().to_string())
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    fn store_cookies(&self, headers: &HeaderMap) {
        let mut jar = self.jar.lock().unwrap();
        for value in headers.get_all(SET_COOKIE) {
            let Ok(cookie) = Cookie::parse(value.to_str().unwrap().to_owned()) else {
                continue;
            };
            let removed = cookie.max_age().is_some_and(|age| age.is_zero())
                || cookie
                    .expires_datetime()
                    .is_some_and(|at| at <= OffsetDateTime::now_utc());
            if removed {
                jar.remove(cookie.name().to_owned());
            } else {
                jar.add(cookie);
            }
        }
    }
}

/// Find the CSRF token embedded in a rendered form.
#[must_use]
pub fn extract_csrf_token(body: &str) -> Option<String> {
    CSRF_FIELD_RX
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_owned())
}

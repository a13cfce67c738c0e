//! Security headers applied to every response.

use axum::{
    extract::Request,
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
            X_XSS_PROTECTION,
        },
    },
    middleware::Next,
    response::Response,
};

/// `Referer-Policy`, the misspelt name existing clients look for. Sent
/// alongside the standard `Referrer-Policy`.
pub const REFERER_POLICY: HeaderName = HeaderName::from_static("referer-policy");

/// Value of both referrer policy headers.
pub const REFERRER_POLICY_VALUE: &str = "origin-when-cross-origin";

/// Content Security Policy. Stylesheets and fonts may come from Google Fonts;
/// everything else must be same-origin.
pub const CONTENT_SECURITY_POLICY_VALUE: &str =
    "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com";

/// Add the security headers to the response.
///
/// Headers applied:
/// - `Content-Security-Policy` - see [`CONTENT_SECURITY_POLICY_VALUE`]
/// - `Referer-Policy` and `Referrer-Policy: origin-when-cross-origin`
/// - `X-Content-Type-Options: nosniff`
/// - `X-Frame-Options: deny`
/// - `X-XSS-Protection: 0` - disables the legacy auditor in favour of CSP
///
/// Runs outside routing, so 404s carry the headers too. Panic responses never
/// pass back through here; [`RecoverPanic`](super::RecoverPanic) applies the
/// same set itself.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut());
    response
}

/// Insert the security headers into `headers`.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    let fixed: [(HeaderName, &'static str); 6] = [
        (CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY_VALUE),
        (REFERER_POLICY, REFERRER_POLICY_VALUE),
        (REFERRER_POLICY, REFERRER_POLICY_VALUE),
        (X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (X_FRAME_OPTIONS, "deny"),
        (X_XSS_PROTECTION, "0"),
    ];

    for (name, value) in fixed {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn,
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_headers_on_success_and_not_found() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn(security_headers_middleware));

        for (path, status) in [("/", StatusCode::OK), ("/missing", StatusCode::NOT_FOUND)] {
            let response = app
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            let headers = response.headers();

            assert_eq!(response.status(), status);
            assert_eq!(
                headers.get(CONTENT_SECURITY_POLICY).unwrap(),
                CONTENT_SECURITY_POLICY_VALUE
            );
            assert_eq!(headers.get("referer-policy").unwrap(), "origin-when-cross-origin");
            assert_eq!(headers.get(REFERRER_POLICY).unwrap(), "origin-when-cross-origin");
            assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
            assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), "deny");
            assert_eq!(headers.get(X_XSS_PROTECTION).unwrap(), "0");
        }
    }
}

//! Panic recovery.
//!
//! `CatchPanicLayer` turns a panicking handler into a response. This module
//! supplies that response: the panic is logged with a backtrace and the client
//! gets a bare 500 with `Connection: close`, so the server drops the
//! connection once the response is written.
//!
//! The layer sits outside the session layer. A panic therefore unwinds past
//! the session save and whatever the handler wrote to the session is lost.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, PanicHookInfo};
use std::sync::Once;

use axum::{
    body::Body,
    http::{
        HeaderValue, Response, StatusCode,
        header::{CONNECTION, CONTENT_TYPE},
    },
};
use tower_http::catch_panic::ResponseForPanic;

use super::security_headers::apply_security_headers;

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicReport>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

#[derive(Debug)]
struct PanicReport {
    location: String,
    backtrace: String,
}

/// Builds the response for a recovered panic.
///
/// With `debug` set, the panic message and backtrace are written into the
/// response body. Never enable that in production.
#[derive(Debug, Clone, Copy)]
pub struct RecoverPanic {
    debug: bool,
}

impl RecoverPanic {
    /// Create the responder and install the panic hook that records
    /// backtraces for it.
    #[must_use]
    pub fn new(debug: bool) -> Self {
        install_hook();
        Self { debug }
    }
}

impl ResponseForPanic for RecoverPanic {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let message = panic_message(err.as_ref());
        let report = LAST_PANIC.with(|cell| cell.borrow_mut().take());
        let (location, backtrace) = report.map_or_else(
            || ("unknown".to_owned(), String::new()),
            |report| (report.location, report.backtrace),
        );

        tracing::error!(
            panic.message = %message,
            panic.location = %location,
            backtrace = %backtrace,
            "Recovered from panic in request handler"
        );

        let body = if self.debug {
            format!("{message}\n\n{backtrace}")
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_owned()
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        let headers = response.headers_mut();
        apply_security_headers(headers);
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// Extract a human-readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_owned()
    }
}

/// Record where each panic happened, then defer to the previous hook
/// (Sentry's panic integration, or the default stderr printer).
fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            let location = info
                .location()
                .map_or_else(|| "unknown".to_owned(), ToString::to_string);
            let backtrace = Backtrace::force_capture().to_string();
            LAST_PANIC.with(|cell| {
                *cell.borrow_mut() = Some(PanicReport {
                    location,
                    backtrace,
                });
            });
            previous(info);
        }));
    });
}

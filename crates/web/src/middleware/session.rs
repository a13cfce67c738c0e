//! Session layer and typed session access.
//!
//! `SessionManagerLayer` loads the session named by the `session` cookie at
//! the start of a dynamic-chain request (or starts an empty one) and saves it
//! once the inner service returns. A panic unwinds straight past the save, so
//! nothing a faulting handler wrote to the session is persisted.
//!
//! Session ID renewal is deferred the same way. [`SessionHandle::renew_token`]
//! only marks the session, and [`session_renewal_middleware`] moves it to the
//! new ID after the handler returns. Moving the ID deletes the old record from
//! the store, so it must not happen for a request whose writes are discarded.

use std::sync::{Arc, atomic::{AtomicBool, Ordering}};

use axum::{
    extract::{FromRequestParts, Request},
    http::{Extensions, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Serialize, de::DeserializeOwned};
use tower_sessions::{
    Expiry, Session, SessionManagerLayer, SessionStore,
    cookie::{SameSite, time::Duration},
    session,
};

use snippetbox_core::UserId;

use crate::config::AppConfig;
use crate::error::AppError;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "session";

/// Session lifetime in seconds (12 hours).
pub const SESSION_LIFETIME_SECONDS: i64 = 12 * 60 * 60;

/// Session keys.
pub mod keys {
    /// ID of the logged-in user. Absent or 0 means anonymous.
    pub const AUTHENTICATED_USER_ID: &str = "authenticatedUserID";

    /// One-shot notice shown on the next rendered page.
    pub const FLASH: &str = "flash";

    /// Session-bound CSRF token.
    pub const CSRF_TOKEN: &str = "csrf_token";
}

/// Create the session layer over a session store.
///
/// The store is generic so production can use `PostgresStore` and tests
/// `MemoryStore` with the same layer configuration.
#[must_use]
pub fn create_session_layer<Store>(store: Store, config: &AppConfig) -> SessionManagerLayer<Store>
where
    Store: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            SESSION_LIFETIME_SECONDS,
        )))
        .with_secure(config.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Handle to the current request's session.
///
/// Extracted in handlers and middleware that run inside the session layer.
/// Clones share the pending-renewal flag.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session: Session,
    renewal_pending: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Wrap a session.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            renewal_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Store a value under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be loaded or the value cannot be
    /// serialized.
    pub async fn put<T: Serialize + Send>(
        &self,
        key: &str,
        value: T,
    ) -> Result<(), session::Error> {
        self.session.insert(key, value).await
    }

    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be loaded or the stored value
    /// has a different type.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, session::Error> {
        self.session.get(key).await
    }

    /// Read and delete a string value.
    ///
    /// Used for flash messages: once popped, the value is gone for this and
    /// every later request.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be loaded or the stored value is
    /// not a string.
    pub async fn pop_string(&self, key: &str) -> Result<Option<String>, session::Error> {
        self.session.remove::<String>(key).await
    }

    /// Delete the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be loaded.
    pub async fn remove(&self, key: &str) -> Result<(), session::Error> {
        self.session.remove_value(key).await?;
        Ok(())
    }

    /// Move the session data to a fresh session ID once the request
    /// completes.
    ///
    /// Must be called on every privilege change (login and logout) so a
    /// session ID planted before the change is worthless after it. The CSRF
    /// token is dropped now; the CSRF guard issues a new one before the
    /// response goes out. The old record stays in the store until
    /// [`apply_pending_renewal`](Self::apply_pending_renewal) runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be loaded.
    pub async fn renew_token(&self) -> Result<(), session::Error> {
        self.renewal_pending.store(true, Ordering::Release);
        self.remove(keys::CSRF_TOKEN).await
    }

    /// Whether [`renew_token`](Self::renew_token) was called and not yet
    /// applied.
    #[must_use]
    pub fn renewal_pending(&self) -> bool {
        self.renewal_pending.load(Ordering::Acquire)
    }

    /// Move the session to a new ID if a renewal is pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the old session cannot be deleted from the store.
    pub async fn apply_pending_renewal(&self) -> Result<(), session::Error> {
        if self.renewal_pending.swap(false, Ordering::AcqRel) {
            self.session.cycle_id().await?;
        }
        Ok(())
    }

    /// The logged-in user recorded in the session, if any.
    ///
    /// A stored ID of 0 is treated as anonymous.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be loaded.
    pub async fn authenticated_user_id(&self) -> Result<Option<UserId>, session::Error> {
        Ok(self
            .get::<UserId>(keys::AUTHENTICATED_USER_ID)
            .await?
            .filter(|id| id.as_i32() != 0))
    }

    /// The handle installed by [`session_renewal_middleware`], or a fresh one
    /// over the session layer's `Session`.
    fn from_extensions(extensions: &Extensions) -> Result<Self, AppError> {
        if let Some(handle) = extensions.get::<Self>() {
            return Ok(handle.clone());
        }
        extensions
            .get::<Session>()
            .cloned()
            .map(Self::new)
            .ok_or_else(|| AppError::Internal("session layer is not installed".to_owned()))
    }

    /// The underlying session.
    #[must_use]
    pub const fn inner(&self) -> &Session {
        &self.session
    }
}

/// Apply a pending session ID renewal after the handler returns.
///
/// Must run directly inside the session layer. Skipped for server errors,
/// which the session layer does not save either, and never reached when the
/// handler panics.
///
/// # Errors
///
/// Returns `AppError::Session` if the old session cannot be deleted.
pub async fn session_renewal_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let handle = SessionHandle::from_extensions(request.extensions())?;
    request.extensions_mut().insert(handle.clone());

    let response = next.run(request).await;

    if response.status().is_server_error() {
        if handle.renewal_pending() {
            tracing::warn!("session renewal dropped with failed response");
        }
        return Ok(response);
    }

    handle.apply_pending_renewal().await?;
    Ok(response)
}

impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_extensions(&parts.extensions)
    }
}

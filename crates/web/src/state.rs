//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{SnippetStore, UserStore};
use crate::services::auth::AuthService;

/// Application state shared across all handlers.
///
/// Built once at startup and never mutated afterwards. Cloning is an `Arc`
/// bump. The stores are trait objects so the same router serves `PostgreSQL`
/// in production and in-memory stores in tests.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    snippets: Box<dyn SnippetStore>,
    users: Box<dyn UserStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration
    /// * `snippets` - Snippet store
    /// * `users` - User store
    #[must_use]
    pub fn new(
        config: AppConfig,
        snippets: impl SnippetStore + 'static,
        users: impl UserStore + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                snippets: Box::new(snippets),
                users: Box::new(users),
            }),
        }
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get the snippet store.
    #[must_use]
    pub fn snippets(&self) -> &dyn SnippetStore {
        self.inner.snippets.as_ref()
    }

    /// Get the user store.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }

    /// Get an authentication service over the user store.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.users())
    }
}

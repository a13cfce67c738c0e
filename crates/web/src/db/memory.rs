//! In-memory stores.
//!
//! Drop-in replacements for the `PostgreSQL` stores, used by tests and by
//! anything that needs a working app without a database. Handles are cheap
//! clones sharing the same data, so a test can keep one and inspect or mutate
//! state behind the app's back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use snippetbox_core::{Email, SnippetId, SnippetLifetime, UserId};

use super::{LATEST_LIMIT, RepositoryError, SnippetStore, StoredCredentials, UserStore};
use crate::models::Snippet;

/// Snippet store held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySnippetStore {
    snippets: Arc<RwLock<Vec<Snippet>>>,
}

impl MemorySnippetStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snippet with an explicit expiry time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the ID space is exhausted.
    pub async fn insert_expiring_at(
        &self,
        title: &str,
        content: &str,
        expires: DateTime<Utc>,
    ) -> Result<SnippetId, RepositoryError> {
        let mut snippets = self.snippets.write().await;
        let id = next_id(snippets.len())?;
        snippets.push(Snippet {
            id: SnippetId::new(id),
            title: title.to_owned(),
            content: content.to_owned(),
            created: Utc::now(),
            expires,
        });
        Ok(SnippetId::new(id))
    }

    /// Number of stored snippets, expired ones included.
    pub async fn len(&self) -> usize {
        self.snippets.read().await.len()
    }

    /// Whether the store holds no snippets at all.
    pub async fn is_empty(&self) -> bool {
        self.snippets.read().await.is_empty()
    }
}

#[async_trait]
impl SnippetStore for MemorySnippetStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        lifetime: SnippetLifetime,
    ) -> Result<SnippetId, RepositoryError> {
        let expires = Utc::now() + Duration::days(i64::from(lifetime.days()));
        self.insert_expiring_at(title, content, expires).await
    }

    async fn get(&self, id: SnippetId) -> Result<Snippet, RepositoryError> {
        let now = Utc::now();
        self.snippets
            .read()
            .await
            .iter()
            .find(|snippet| snippet.id == id && !snippet.is_expired_at(now))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, RepositoryError> {
        let now = Utc::now();
        Ok(self
            .snippets
            .read()
            .await
            .iter()
            .rev()
            .filter(|snippet| !snippet.is_expired_at(now))
            .take(LATEST_LIMIT)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone)]
struct UserRecord {
    id: UserId,
    email: Email,
    password_hash: String,
}

/// User store held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<Vec<UserRecord>>>,
    issued: Arc<RwLock<usize>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users registered under `email`.
    pub async fn count_by_email(&self, email: &str) -> usize {
        self.users
            .read()
            .await
            .iter()
            .filter(|user| user.email.as_str() == email)
            .count()
    }

    /// Delete a user, returning whether it existed.
    pub async fn remove(&self, id: UserId) -> bool {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|user| user.id != id);
        users.len() != before
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(
        &self,
        _name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<UserId, RepositoryError> {
        let mut users = self.users.write().await;
        if users.iter().any(|user| &user.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        // IDs are never reused, even after `remove`
        let mut issued = self.issued.write().await;
        let id = UserId::new(next_id(*issued)?);
        *issued += 1;

        users.push(UserRecord {
            id,
            email: email.clone(),
            password_hash: password_hash.to_owned(),
        });
        Ok(id)
    }

    async fn credentials(
        &self,
        email: &Email,
    ) -> Result<Option<StoredCredentials>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|user| &user.email == email)
            .map(|user| StoredCredentials {
                id: user.id,
                password_hash: user.password_hash.clone(),
            }))
    }

    async fn exists(&self, id: UserId) -> Result<bool, RepositoryError> {
        Ok(self.users.read().await.iter().any(|user| user.id == id))
    }
}

fn next_id(count: usize) -> Result<i32, RepositoryError> {
    count
        .checked_add(1)
        .and_then(|next| i32::try_from(next).ok())
        .ok_or_else(|| RepositoryError::DataCorruption("id space exhausted".to_owned()))
}

//! `PostgreSQL` snippet store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use snippetbox_core::{SnippetId, SnippetLifetime};

use super::{LATEST_LIMIT, RepositoryError, SnippetStore};
use crate::models::Snippet;

/// Snippet store backed by the `snippets` table.
#[derive(Debug, Clone)]
pub struct PgSnippetStore {
    pool: PgPool,
}

impl PgSnippetStore {
    /// Create a store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SnippetRow {
    id: i32,
    title: String,
    content: String,
    created: DateTime<Utc>,
    expires: DateTime<Utc>,
}

impl From<SnippetRow> for Snippet {
    fn from(row: SnippetRow) -> Self {
        Self {
            id: SnippetId::new(row.id),
            title: row.title,
            content: row.content,
            created: row.created,
            expires: row.expires,
        }
    }
}

#[async_trait]
impl SnippetStore for PgSnippetStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        lifetime: SnippetLifetime,
    ) -> Result<SnippetId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO snippets (title, content, created, expires)
            VALUES ($1, $2, NOW(), NOW() + make_interval(days => $3))
            RETURNING id
            ",
        )
        .bind(title)
        .bind(content)
        .bind(lifetime.days())
        .fetch_one(&self.pool)
        .await?;

        Ok(SnippetId::new(id))
    }

    async fn get(&self, id: SnippetId) -> Result<Snippet, RepositoryError> {
        sqlx::query_as::<_, SnippetRow>(
            r"
            SELECT id, title, content, created, expires
            FROM snippets
            WHERE expires > NOW() AND id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?
        .map(Snippet::from)
        .ok_or(RepositoryError::NotFound)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, RepositoryError> {
        let limit = i64::try_from(LATEST_LIMIT)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid limit: {e}")))?;

        let rows = sqlx::query_as::<_, SnippetRow>(
            r"
            SELECT id, title, content, created, expires
            FROM snippets
            WHERE expires > NOW()
            ORDER BY id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Snippet::from).collect())
    }
}

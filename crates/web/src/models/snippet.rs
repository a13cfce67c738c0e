//! Snippet domain model.

use chrono::{DateTime, Utc};

use snippetbox_core::SnippetId;

/// A stored snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub id: SnippetId,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl Snippet {
    /// Whether the snippet has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// Creation time formatted for display.
    #[must_use]
    pub fn created_display(&self) -> String {
        human_date(&self.created)
    }

    /// Expiry time formatted for display.
    #[must_use]
    pub fn expires_display(&self) -> String {
        human_date(&self.expires)
    }
}

/// Format a timestamp as e.g. `17 Mar 2024 at 10:15` (UTC).
#[must_use]
pub fn human_date(time: &DateTime<Utc>) -> String {
    time.format("%d %b %Y at %H:%M").to_string()
}

//! Snippet lifetimes.

use serde::{Deserialize, Serialize};

/// How long a snippet stays visible after creation.
///
/// Only three lifetimes are offered on the create form; anything else is a
/// validation error rather than a silently clamped value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnippetLifetime {
    /// One day.
    Day,
    /// Seven days.
    Week,
    /// 365 days.
    #[default]
    Year,
}

impl SnippetLifetime {
    /// The lifetimes accepted on the create form, in days.
    pub const PERMITTED_DAYS: [i32; 3] = [1, 7, 365];

    /// Look up the lifetime for a number of days.
    #[must_use]
    pub const fn from_days(days: i32) -> Option<Self> {
        match days {
            1 => Some(Self::Day),
            7 => Some(Self::Week),
            365 => Some(Self::Year),
            _ => None,
        }
    }

    /// Number of days the snippet lives.
    #[must_use]
    pub const fn days(self) -> i32 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Year => 365,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permitted_days_round_trip() {
        for days in SnippetLifetime::PERMITTED_DAYS {
            let lifetime = SnippetLifetime::from_days(days);
            assert_eq!(lifetime.map(SnippetLifetime::days), Some(days));
        }
    }

    #[test]
    fn test_other_days_rejected() {
        assert_eq!(SnippetLifetime::from_days(0), None);
        assert_eq!(SnippetLifetime::from_days(30), None);
        assert_eq!(SnippetLifetime::from_days(-7), None);
    }

    #[test]
    fn test_default_is_one_year() {
        assert_eq!(SnippetLifetime::default().days(), 365);
    }
}

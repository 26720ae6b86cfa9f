use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// A stored license record. The surrogate `id` stays internal; the key is
/// what clients present.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct License {
    #[serde(skip_serializing)]
    pub id: i64,
    pub key: String,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub notes: Option<String>,
}

impl License {
    /// Expired strictly after `expires_at`; a license without expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if now > expiry)
    }

    pub fn owner_display(&self) -> &str {
        self.owner.as_deref().unwrap_or("-")
    }

    pub fn notes_display(&self) -> &str {
        self.notes.as_deref().unwrap_or("")
    }

    pub fn created_display(&self) -> String {
        self.created_at.format(DISPLAY_FORMAT).to_string()
    }

    pub fn expires_display(&self) -> String {
        match self.expires_at {
            Some(expiry) => expiry.format(DISPLAY_FORMAT).to_string(),
            None => "never".to_string(),
        }
    }
}

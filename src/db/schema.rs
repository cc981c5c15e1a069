//! Database schema and row types

use crate::dialog::Stack;
use chrono::{DateTime, Utc};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    user_id INTEGER PRIMARY KEY,
    stack TEXT NOT NULL,
    depth INTEGER NOT NULL,
    top_flow TEXT,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at);
";

/// A persisted session
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub user_id: i64,
    pub stack: Stack,
    pub updated_at: DateTime<Utc>,
}

impl StoredSession {
    /// Whether the session was last touched more than `ttl` ago
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        stale_cutoff(now, ttl).is_some_and(|cutoff| self.updated_at < cutoff)
    }
}

/// Sessions touched before this instant are stale; `None` when `ttl` reaches
/// past the earliest representable time, so nothing is.
pub fn stale_cutoff(now: DateTime<Utc>, ttl: chrono::Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(ttl)
}

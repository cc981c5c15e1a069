//! Database module
//!
//! Persists each user's dialog stack as JSON, one row per user.

mod schema;

pub use schema::*;

use crate::dialog::Stack;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Stored stack of user {user_id} is unreadable: {source}")]
    CorruptStack {
        user_id: i64,
        source: serde_json::Error,
    },
    #[error("Failed to encode stack: {0}")]
    Encode(serde_json::Error),
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        self.lock()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    // ==================== Session Operations ====================

    /// Load a user's session, `None` if there is none
    pub fn load_session(&self, user_id: i64) -> DbResult<Option<StoredSession>> {
        let conn = self.lock()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT stack, updated_at FROM sessions WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((json, updated_at)) = row else {
            return Ok(None);
        };
        let stack: Stack = serde_json::from_str(&json)
            .map_err(|source| DbError::CorruptStack { user_id, source })?;
        Ok(Some(StoredSession {
            user_id,
            stack,
            updated_at: from_timestamp(updated_at),
        }))
    }

    /// Insert or replace a user's stack
    pub fn save_stack(&self, user_id: i64, stack: &Stack) -> DbResult<()> {
        self.save_stack_at(user_id, stack, Utc::now())
    }

    fn save_stack_at(&self, user_id: i64, stack: &Stack, at: DateTime<Utc>) -> DbResult<()> {
        let json = serde_json::to_string(stack).map_err(DbError::Encode)?;
        let top_flow = stack.top().map(|f| f.ops().flow_id().as_str());
        let depth = i64::try_from(stack.depth()).unwrap_or(i64::MAX);

        self.lock()?.execute(
            "INSERT INTO sessions (user_id, stack, depth, top_flow, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                stack = excluded.stack,
                depth = excluded.depth,
                top_flow = excluded.top_flow,
                updated_at = excluded.updated_at",
            params![user_id, json, depth, top_flow, at.timestamp()],
        )?;
        Ok(())
    }

    /// Forget a user's session. Returns whether one existed.
    pub fn clear_stack(&self, user_id: i64) -> DbResult<bool> {
        let deleted = self
            .lock()?
            .execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
        Ok(deleted > 0)
    }

    /// Delete sessions not touched since `cutoff`
    pub fn prune_stale_sessions(&self, cutoff: DateTime<Utc>) -> DbResult<usize> {
        let deleted = self.lock()?.execute(
            "DELETE FROM sessions WHERE updated_at < ?1",
            params![cutoff.timestamp()],
        )?;
        Ok(deleted)
    }

    pub fn session_count(&self) -> DbResult<usize> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn from_timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

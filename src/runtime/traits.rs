//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::db::{Database, DbError};
use crate::dialog::{Screen, Stack};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Storage for per-user dialog stacks
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the saved stack, `None` for an unknown (or expired) session
    async fn load(&self, user_id: i64) -> Result<Option<Stack>, String>;

    /// Save the stack of a settled session
    async fn save(&self, user_id: i64, stack: &Stack) -> Result<(), String>;
}

/// Turns the top frame's view into user-facing output
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, user_id: i64, screen: &Screen) -> Result<(), String>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn load(&self, user_id: i64) -> Result<Option<Stack>, String> {
        (**self).load(user_id).await
    }

    async fn save(&self, user_id: i64, stack: &Stack) -> Result<(), String> {
        (**self).save(user_id, stack).await
    }
}

#[async_trait]
impl<T: Renderer + ?Sized> Renderer for Arc<T> {
    async fn render(&self, user_id: i64, screen: &Screen) -> Result<(), String> {
        (**self).render(user_id, screen).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a session store
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
    /// Stacks untouched for longer than this are discarded on load
    ttl: chrono::Duration,
}

impl DatabaseStore {
    pub fn new(db: Database, ttl: chrono::Duration) -> Self {
        Self { db, ttl }
    }
}

#[async_trait]
impl SessionStore for DatabaseStore {
    async fn load(&self, user_id: i64) -> Result<Option<Stack>, String> {
        let session = match self.db.load_session(user_id) {
            Ok(session) => session,
            Err(e @ DbError::CorruptStack { .. }) => {
                tracing::warn!(user_id, error = %e, "Dropping unreadable session");
                self.db.clear_stack(user_id).map_err(|e| e.to_string())?;
                return Ok(None);
            }
            Err(e) => return Err(e.to_string()),
        };

        match session {
            Some(session) if session.is_stale(Utc::now(), self.ttl) => {
                tracing::info!(
                    user_id,
                    updated_at = %session.updated_at,
                    depth = session.stack.depth(),
                    "Discarding expired session"
                );
                self.db.clear_stack(user_id).map_err(|e| e.to_string())?;
                Ok(None)
            }
            Some(session) => Ok(Some(session.stack)),
            None => Ok(None),
        }
    }

    async fn save(&self, user_id: i64, stack: &Stack) -> Result<(), String> {
        self.db
            .save_stack(user_id, stack)
            .map_err(|e| e.to_string())
    }
}

//! Room backend collaborator
//!
//! Flows never talk to the backend directly. They return a request from a
//! step, the runtime executes it through a [`Backend`] and feeds the outcome
//! back into the engine as a reply event.

mod error;
mod http;
mod memory;
mod retry;
mod types;

pub use error::{BackendError, NO_ROOM};
pub use http::HttpBackend;
pub use memory::InMemoryBackend;
pub use retry::RetryingBackend;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Request/response access to the room backend on behalf of one user
#[async_trait]
pub trait Backend: Send + Sync {
    async fn call(
        &self,
        user_id: i64,
        request: &BackendRequest,
    ) -> Result<BackendResponse, BackendError>;
}

#[async_trait]
impl<T: Backend + ?Sized> Backend for Arc<T> {
    async fn call(
        &self,
        user_id: i64,
        request: &BackendRequest,
    ) -> Result<BackendResponse, BackendError> {
        (**self).call(user_id, request).await
    }
}

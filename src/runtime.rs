//! Runtime for dialog sessions
//!
//! One task per active user processes that user's events in arrival order.
//! Different users run concurrently and never share a stack.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

use executor::SessionRuntime;
pub use traits::*;

use crate::backend::Backend;
use crate::dialog::Event;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Events buffered per session before senders wait
const EVENT_BUFFER: usize = 32;

/// Handle to a running session
struct SessionHandle {
    event_tx: mpsc::Sender<Event>,
    task: JoinHandle<()>,
}

/// Manager for all session runtimes
pub struct SessionManager<S, B, R>
where
    S: SessionStore + ?Sized + 'static,
    B: Backend + ?Sized + 'static,
    R: Renderer + ?Sized + 'static,
{
    store: Arc<S>,
    backend: Arc<B>,
    renderer: Arc<R>,
    idle_timeout: Duration,
    sessions: RwLock<HashMap<i64, SessionHandle>>,
    shutdown: CancellationToken,
}

impl<S, B, R> SessionManager<S, B, R>
where
    S: SessionStore + ?Sized + 'static,
    B: Backend + ?Sized + 'static,
    R: Renderer + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, backend: Arc<B>, renderer: Arc<R>, idle_timeout: Duration) -> Self {
        Self {
            store,
            backend,
            renderer,
            idle_timeout,
            sessions: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Queue an event for a user, starting their runtime if needed
    pub async fn send(&self, user_id: i64, event: Event) -> Result<(), String> {
        let mut event = event;
        loop {
            if self.shutdown.is_cancelled() {
                return Err("runtime is shutting down".to_string());
            }
            let sender = self.sender(user_id).await;
            match sender.send(event).await {
                Ok(()) => return Ok(()),
                // The runtime retired between lookup and send
                Err(mpsc::error::SendError(returned)) => event = returned,
            }
        }
    }

    /// Get the sender of a live runtime, or start a new one
    async fn sender(&self, user_id: i64) -> mpsc::Sender<Event> {
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(&user_id) {
                if !handle.event_tx.is_closed() {
                    return handle.event_tx.clone();
                }
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(&user_id) {
            if !handle.event_tx.is_closed() {
                return handle.event_tx.clone();
            }
        }

        // A retired runtime may still be draining; the new one waits for its
        // last save before loading the stack
        let retired = sessions.remove(&user_id);
        sessions.retain(|_, handle| !handle.task.is_finished());

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let runtime = SessionRuntime::new(
            user_id,
            self.store.clone(),
            self.backend.clone(),
            self.renderer.clone(),
            event_rx,
            self.idle_timeout,
            self.shutdown.child_token(),
        );
        let task = tokio::spawn(async move {
            if let Some(retired) = retired {
                if let Err(e) = retired.task.await {
                    tracing::error!(user_id, error = %e, "Session runtime panicked");
                }
            }
            runtime.run().await;
        });
        tracing::info!(user_id, "Started session runtime");

        sessions.insert(
            user_id,
            SessionHandle {
                event_tx: event_tx.clone(),
                task,
            },
        );
        event_tx
    }

    /// Number of runtimes still accepting events
    pub async fn active_sessions(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|h| !h.event_tx.is_closed())
            .count()
    }

    /// Handles kept in the session map, live or draining
    #[cfg(test)]
    async fn tracked_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Stop every runtime and wait for them to finish their queued events
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handles: Vec<SessionHandle> =
            self.sessions.write().await.drain().map(|(_, h)| h).collect();
        let count = handles.len();
        for result in futures::future::join_all(handles.into_iter().map(|h| h.task)).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Session runtime panicked during shutdown");
            }
        }
        tracing::info!(sessions = count, "All session runtimes stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{
        seeded_backend, MemoryStore, RecordingRenderer, ScriptedBackend, ANNA, BORIS,
    };
    use super::*;
    use crate::dialog::{Button, FlowId};

    type TestManager = SessionManager<MemoryStore, ScriptedBackend, RecordingRenderer>;

    fn manager(
        backend: ScriptedBackend,
        idle: Duration,
    ) -> (TestManager, Arc<MemoryStore>, Arc<RecordingRenderer>) {
        let store = Arc::new(MemoryStore::new());
        let renderer = Arc::new(RecordingRenderer::new());
        let manager =
            SessionManager::new(store.clone(), Arc::new(backend), renderer.clone(), idle);
        (manager, store, renderer)
    }

    #[tokio::test]
    async fn events_of_one_user_run_in_order() {
        let backend =
            ScriptedBackend::new(seeded_backend().0).with_delay(Duration::from_millis(5));
        let (manager, store, renderer) = manager(backend, Duration::from_secs(60));

        manager.send(ANNA, Event::Start).await.unwrap();
        // Sent before the first event finished; still applied to its result
        manager.send(ANNA, Event::press(None, Button::Tasks)).await.unwrap();
        manager.shutdown().await;

        assert_eq!(
            store.stack(ANNA).unwrap().flows(),
            vec![FlowId::Home, FlowId::Tasks]
        );
        assert_eq!(renderer.screens(ANNA).len(), 2);
    }

    #[tokio::test]
    async fn users_get_separate_stacks() {
        let (manager, store, _renderer) =
            manager(ScriptedBackend::new(seeded_backend().0), Duration::from_secs(60));

        manager.send(ANNA, Event::Start).await.unwrap();
        manager.send(BORIS, Event::Start).await.unwrap();
        manager.send(BORIS, Event::press(None, Button::Rules)).await.unwrap();
        assert_eq!(manager.active_sessions().await, 2);
        manager.shutdown().await;

        assert_eq!(store.stack(ANNA).unwrap().flows(), vec![FlowId::Home]);
        assert_eq!(
            store.stack(BORIS).unwrap().flows(),
            vec![FlowId::Home, FlowId::Rules]
        );
    }

    #[tokio::test]
    async fn idle_runtime_retires_and_resumes_from_the_store() {
        let (manager, store, renderer) =
            manager(ScriptedBackend::new(seeded_backend().0), Duration::from_millis(20));

        manager.send(ANNA, Event::Start).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.active_sessions().await, 0);

        manager.send(ANNA, Event::press(None, Button::Tasks)).await.unwrap();
        manager.shutdown().await;

        assert_eq!(
            store.stack(ANNA).unwrap().flows(),
            vec![FlowId::Home, FlowId::Tasks]
        );
        assert_eq!(renderer.screens(ANNA).len(), 2);
    }

    #[tokio::test]
    async fn finished_runtimes_are_pruned_on_the_next_start() {
        let (manager, _store, _renderer) =
            manager(ScriptedBackend::new(seeded_backend().0), Duration::from_millis(20));

        manager.send(ANNA, Event::Start).await.unwrap();
        manager.send(BORIS, Event::Start).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.tracked_sessions().await, 2);

        manager.send(ANNA, Event::press(None, Button::Tasks)).await.unwrap();
        assert_eq!(manager.tracked_sessions().await, 1);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn send_after_shutdown_fails() {
        let (manager, _store, _renderer) =
            manager(ScriptedBackend::new(seeded_backend().0), Duration::from_secs(60));
        manager.shutdown().await;
        assert!(manager.send(ANNA, Event::Start).await.is_err());
    }
}

//! Per-session runtime executor

use super::traits::{Renderer, SessionStore};
use crate::backend::Backend;
use crate::dialog::{transition, Effect, Event, Screen, Stack, TransitionError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Runs one user's events strictly in order against their stack
pub struct SessionRuntime<S, B, R>
where
    S: SessionStore + ?Sized,
    B: Backend + ?Sized,
    R: Renderer + ?Sized,
{
    user_id: i64,
    stack: Stack,
    store: Arc<S>,
    backend: Arc<B>,
    renderer: Arc<R>,
    event_rx: mpsc::Receiver<Event>,
    /// Quiet period after which the runtime retires itself
    idle_timeout: Duration,
    shutdown: CancellationToken,
}

impl<S, B, R> SessionRuntime<S, B, R>
where
    S: SessionStore + ?Sized,
    B: Backend + ?Sized,
    R: Renderer + ?Sized,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: i64,
        store: Arc<S>,
        backend: Arc<B>,
        renderer: Arc<R>,
        event_rx: mpsc::Receiver<Event>,
        idle_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            user_id,
            stack: Stack::default(),
            store,
            backend,
            renderer,
            event_rx,
            idle_timeout,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        self.load().await;

        // Process events in a loop until idle, closed or shut down
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    tracing::debug!(user_id = self.user_id, "Shutdown requested");
                    break;
                }
                received = tokio::time::timeout(self.idle_timeout, self.event_rx.recv()) => {
                    match received {
                        Ok(Some(event)) => {
                            // Rejections are reported to the user inside
                            let _ = self.process_event(event).await;
                        }
                        Ok(None) => break,
                        Err(_) => {
                            tracing::debug!(user_id = self.user_id, "Session idle, retiring runtime");
                            break;
                        }
                    }
                }
            }
        }

        // Senders see the channel closed from here on; finish what they already queued
        self.event_rx.close();
        while let Some(event) = self.event_rx.recv().await {
            let _ = self.process_event(event).await;
        }

        tracing::info!(user_id = self.user_id, "Session runtime stopped");
    }

    /// Replace the empty stack with the user's saved one, if any
    pub async fn load(&mut self) {
        match self.store.load(self.user_id).await {
            Ok(Some(stack)) => {
                tracing::debug!(user_id = self.user_id, depth = stack.depth(), "Resuming session");
                self.stack = stack;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(user_id = self.user_id, error = %e, "Failed to load session");
            }
        }
    }

    /// Run one inbound event and every backend round trip it causes.
    ///
    /// A rejected event leaves the stack exactly as it was before the event,
    /// skips persistence and renders one screen carrying the error message.
    pub async fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        let snapshot = self.stack.clone();
        let mut notices = Vec::new();
        let mut events = VecDeque::from([event]);

        while let Some(current) = events.pop_front() {
            let result = match transition(&self.stack, current) {
                Ok(result) => result,
                Err(e) => {
                    self.stack = snapshot;
                    self.report(&e).await;
                    return Err(e);
                }
            };
            self.stack = result.new_stack;

            for effect in result.effects {
                match effect {
                    Effect::CallBackend { frame, request } => {
                        tracing::debug!(user_id = self.user_id, frame = %frame, op = request.op(), "Calling backend");
                        let outcome = self.backend.call(self.user_id, &request).await;
                        if let Err(e) = &outcome {
                            tracing::info!(user_id = self.user_id, op = request.op(), error = %e, "Backend call failed");
                        }
                        events.push_back(Event::BackendReply { frame, outcome });
                    }
                    Effect::Notify(text) => notices.push(text),
                    Effect::PersistStack => {
                        if let Err(e) = self.store.save(self.user_id, &self.stack).await {
                            tracing::error!(user_id = self.user_id, error = %e, "Failed to persist stack");
                        }
                    }
                    Effect::Render => {
                        let screen = Screen::of(&self.stack, std::mem::take(&mut notices));
                        self.render(&screen).await;
                    }
                }
            }
        }
        Ok(())
    }

    /// Tell the user an event could not be applied, keeping the current view
    async fn report(&self, error: &TransitionError) {
        if error.is_fatal() {
            tracing::error!(user_id = self.user_id, error = %error, flows = ?self.stack.flows(), "Event aborted");
        } else {
            tracing::info!(user_id = self.user_id, error = %error, "Event rejected");
        }
        let screen = Screen::of(&self.stack, vec![error.user_message().to_string()]);
        self.render(&screen).await;
    }

    async fn render(&self, screen: &Screen) {
        if let Err(e) = self.renderer.render(self.user_id, screen).await {
            tracing::warn!(user_id = self.user_id, error = %e, "Failed to render");
        }
    }

    #[cfg(test)]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendRequest;
    use crate::dialog::{Button, FlowId};
    use crate::runtime::testing::{seeded_backend, MemoryStore, RecordingRenderer, ScriptedBackend};

    const USER: i64 = 1;
    const FATAL: &str = "Something went wrong. Please try again.";

    fn runtime(
        store: Arc<MemoryStore>,
        backend: Arc<ScriptedBackend>,
        renderer: Arc<RecordingRenderer>,
    ) -> (
        SessionRuntime<MemoryStore, ScriptedBackend, RecordingRenderer>,
        mpsc::Sender<Event>,
    ) {
        let (tx, rx) = mpsc::channel(8);
        let runtime = SessionRuntime::new(
            USER,
            store,
            backend,
            renderer,
            rx,
            Duration::from_secs(60),
            CancellationToken::new(),
        );
        (runtime, tx)
    }

    /// Home, the rule list and the rule wizard waiting for the rule text
    async fn in_rule_wizard(
        store: &Arc<MemoryStore>,
        renderer: &Arc<RecordingRenderer>,
    ) -> serde_json::Value {
        let backend = Arc::new(ScriptedBackend::new(seeded_backend().0));
        let (mut runtime, _tx) = runtime(store.clone(), backend, renderer.clone());
        runtime.process_event(Event::Start).await.unwrap();
        let home = runtime.stack().top_id();
        runtime.process_event(Event::press(home, Button::Rules)).await.unwrap();
        let rules = runtime.stack().top_id();
        runtime
            .process_event(Event::press(rules, Button::CreateNew))
            .await
            .unwrap();
        runtime.process_event(Event::text("Quiet hours")).await.unwrap();
        assert_eq!(
            runtime.stack().flows(),
            vec![FlowId::Home, FlowId::Rules, FlowId::CreateRule, FlowId::Prompt]
        );
        serde_json::to_value(runtime.stack()).unwrap()
    }

    /// Resume `stack` in a fresh runtime, as after a restart
    async fn resumed(
        stack: &serde_json::Value,
        store: &Arc<MemoryStore>,
        renderer: &Arc<RecordingRenderer>,
    ) -> SessionRuntime<MemoryStore, ScriptedBackend, RecordingRenderer> {
        let stack: Stack = serde_json::from_value(stack.clone()).unwrap();
        store.save(USER, &stack).await.unwrap();
        let backend = Arc::new(ScriptedBackend::new(seeded_backend().0));
        let (mut runtime, _tx) = runtime(store.clone(), backend, renderer.clone());
        runtime.load().await;
        runtime
    }

    #[tokio::test]
    async fn start_renders_home_once_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let renderer = Arc::new(RecordingRenderer::new());
        let backend = Arc::new(ScriptedBackend::new(seeded_backend().0));
        let (mut runtime, _tx) = runtime(store.clone(), backend.clone(), renderer.clone());

        runtime.process_event(Event::Start).await.unwrap();

        assert_eq!(runtime.stack().flows(), vec![FlowId::Home]);
        assert_eq!(renderer.screens(USER).len(), 1);
        assert_eq!(store.saves(), 1);
        assert_eq!(
            backend.calls(),
            vec![BackendRequest::GetRoomInfo, BackendRequest::GetDailyInfo]
        );
        let screen = renderer.last(USER).unwrap();
        assert!(screen.view.unwrap().text.contains("Flat 9"));
    }

    #[tokio::test]
    async fn input_without_session_asks_for_start() {
        let store = Arc::new(MemoryStore::new());
        let renderer = Arc::new(RecordingRenderer::new());
        let backend = Arc::new(ScriptedBackend::new(seeded_backend().0));
        let (mut runtime, _tx) = runtime(store.clone(), backend, renderer.clone());

        let result = runtime.process_event(Event::text("hello")).await;

        assert_eq!(result, Err(TransitionError::NoActiveFlow));
        let screen = renderer.last(USER).unwrap();
        assert!(screen.view.is_none());
        assert_eq!(
            screen.notices,
            vec![TransitionError::NoActiveFlow.user_message().to_string()]
        );
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn stale_press_leaves_the_stack_alone() {
        let store = Arc::new(MemoryStore::new());
        let renderer = Arc::new(RecordingRenderer::new());
        let backend = Arc::new(ScriptedBackend::new(seeded_backend().0));
        let (mut runtime, _tx) = runtime(store.clone(), backend, renderer.clone());

        runtime.process_event(Event::Start).await.unwrap();
        let home = runtime.stack().top_id();
        runtime
            .process_event(Event::press(home, Button::Tasks))
            .await
            .unwrap();
        assert_eq!(runtime.stack().depth(), 2);

        // A button from the home screen rendered earlier
        let result = runtime
            .process_event(Event::press(home, Button::Rules))
            .await;
        assert!(matches!(result, Err(TransitionError::StaleFrame { .. })));
        assert_eq!(runtime.stack().flows(), vec![FlowId::Home, FlowId::Tasks]);
        let screen = renderer.last(USER).unwrap();
        assert_eq!(screen.frame, runtime.stack().top_id());
        assert_eq!(screen.notices.len(), 1);
    }

    #[tokio::test]
    async fn mismatched_child_result_aborts_the_whole_event() {
        let store = Arc::new(MemoryStore::new());
        let renderer = Arc::new(RecordingRenderer::new());
        let mut stack = in_rule_wizard(&store, &renderer).await;
        // The rule list now believes it is waiting on a delete confirmation
        stack["frames"][1]["pending"] = serde_json::json!({ "DeleteRule": { "id": 1 } });
        let mut runtime = resumed(&stack, &store, &renderer).await;
        let saves = store.saves();
        let screens = renderer.screens(USER).len();

        let result = runtime.process_event(Event::text("No music after 22")).await;

        assert!(matches!(
            result,
            Err(TransitionError::ReplyMismatch {
                flow: FlowId::Rules,
                ..
            })
        ));
        assert_eq!(serde_json::to_value(runtime.stack()).unwrap(), stack);
        assert_eq!(store.saves(), saves);
        let rendered = renderer.screens(USER);
        assert_eq!(rendered.len(), screens + 1);
        let screen = rendered.last().unwrap();
        assert_eq!(screen.notices, vec![FATAL.to_string()]);
        assert_eq!(screen.frame, runtime.stack().top_id());
    }

    #[tokio::test]
    async fn input_to_a_suspended_frame_is_an_invariant_violation() {
        let store = Arc::new(MemoryStore::new());
        let renderer = Arc::new(RecordingRenderer::new());
        let mut stack = in_rule_wizard(&store, &renderer).await;
        // Drop the running prompt so the suspended wizard ends up on top
        stack["frames"].as_array_mut().unwrap().pop();
        let mut runtime = resumed(&stack, &store, &renderer).await;
        let saves = store.saves();
        let screens = renderer.screens(USER).len();

        let result = runtime.process_event(Event::text("No music after 22")).await;

        assert!(matches!(result, Err(TransitionError::InvariantViolation(_))));
        assert_eq!(serde_json::to_value(runtime.stack()).unwrap(), stack);
        assert_eq!(store.saves(), saves);
        let rendered = renderer.screens(USER);
        assert_eq!(rendered.len(), screens + 1);
        assert_eq!(rendered.last().unwrap().notices, vec![FATAL.to_string()]);
    }

    #[tokio::test]
    async fn unrequested_reply_is_reported_once() {
        let store = Arc::new(MemoryStore::new());
        let renderer = Arc::new(RecordingRenderer::new());
        let backend = Arc::new(ScriptedBackend::new(seeded_backend().0));
        let (mut runtime, _tx) = runtime(store.clone(), backend.clone(), renderer.clone());
        runtime.process_event(Event::Start).await.unwrap();
        let before = serde_json::to_value(runtime.stack()).unwrap();
        let home = runtime.stack().top_id().unwrap();

        let result = runtime
            .process_event(Event::BackendReply {
                frame: home,
                outcome: Ok(crate::backend::BackendResponse::Done),
            })
            .await;

        assert!(matches!(result, Err(TransitionError::UnexpectedReply(_))));
        assert_eq!(serde_json::to_value(runtime.stack()).unwrap(), before);
        assert_eq!(store.saves(), 1);
        assert_eq!(backend.calls().len(), 2);
        let rendered = renderer.screens(USER);
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[1].notices, vec![FATAL.to_string()]);
    }

    #[tokio::test]
    async fn run_resumes_the_saved_stack_and_drains_on_close() {
        let store = Arc::new(MemoryStore::new());
        let renderer = Arc::new(RecordingRenderer::new());
        let backend = Arc::new(ScriptedBackend::new(seeded_backend().0));

        let (mut first, _tx) = runtime(store.clone(), backend.clone(), renderer.clone());
        first.process_event(Event::Start).await.unwrap();
        let home = first.stack().top_id();

        let (second, tx) = runtime(store.clone(), backend, renderer.clone());
        tx.send(Event::press(home, Button::Rules)).await.unwrap();
        drop(tx);
        second.run().await;

        let saved = store.stack(USER).unwrap();
        assert_eq!(saved.flows(), vec![FlowId::Home, FlowId::Rules]);
    }
}

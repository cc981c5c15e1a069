//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::executor::SessionRuntime;
use super::traits::*;
use crate::backend::{Backend, BackendError, BackendRequest, BackendResponse, InMemoryBackend};
use crate::dialog::{Button, Choice, Event, FlowId, Screen, Stack, TransitionError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Console user of the seeded world
pub const ANNA: i64 = 1;
pub const BORIS: i64 = 2;

/// Two roommates sharing "Flat 9", with orders `[1, 2]` (id 2) and `[2, 1]` (id 3).
///
/// Returns the backend and the room id.
pub fn seeded_backend() -> (InMemoryBackend, i64) {
    let backend = InMemoryBackend::new();
    backend.add_user(ANNA, "Anna", Some("anna_k"));
    backend.add_user(BORIS, "Boris", Some("boris_m"));
    let room = backend.add_room("Flat 9", &[ANNA, BORIS]);
    backend.add_order(ANNA, &[ANNA, BORIS]);
    backend.add_order(ANNA, &[BORIS, ANNA]);
    (backend, room)
}

// ============================================================================
// Mock Session Store
// ============================================================================

/// Session store keeping stacks in a map
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryStore {
    stacks: Mutex<HashMap<i64, Stack>>,
    saves: Mutex<usize>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack(&self, user_id: i64) -> Option<Stack> {
        self.stacks.lock().unwrap().get(&user_id).cloned()
    }

    /// Number of saves across all users
    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, user_id: i64) -> Result<Option<Stack>, String> {
        Ok(self.stack(user_id))
    }

    async fn save(&self, user_id: i64, stack: &Stack) -> Result<(), String> {
        self.stacks.lock().unwrap().insert(user_id, stack.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

// ============================================================================
// Mock Renderer
// ============================================================================

/// Renderer that records every screen
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingRenderer {
    screens: Mutex<Vec<(i64, Screen)>>,
}

#[allow(dead_code)]
impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screens(&self, user_id: i64) -> Vec<Screen> {
        self.screens
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, screen)| screen.clone())
            .collect()
    }

    pub fn last(&self, user_id: i64) -> Option<Screen> {
        self.screens(user_id).pop()
    }

    pub fn total(&self) -> usize {
        self.screens.lock().unwrap().len()
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn render(&self, user_id: i64, screen: &Screen) -> Result<(), String> {
        self.screens.lock().unwrap().push((user_id, screen.clone()));
        Ok(())
    }
}

// ============================================================================
// Scripted Backend
// ============================================================================

/// In-memory backend with injectable failures and a call log
#[allow(dead_code)]
pub struct ScriptedBackend {
    inner: InMemoryBackend,
    failures: Mutex<HashMap<&'static str, VecDeque<BackendError>>>,
    calls: Mutex<Vec<BackendRequest>>,
    delay: Option<Duration>,
}

#[allow(dead_code)]
impl ScriptedBackend {
    pub fn new(inner: InMemoryBackend) -> Self {
        Self {
            inner,
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next call of `op` with `error`
    pub fn fail(&self, op: &'static str, error: BackendError) {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Every request seen so far, in order
    pub fn calls(&self) -> Vec<BackendRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn call(
        &self,
        user_id: i64,
        request: &BackendRequest,
    ) -> Result<BackendResponse, BackendError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self
            .failures
            .lock()
            .unwrap()
            .get_mut(request.op())
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(error) => Err(error),
            None => self.inner.handle(user_id, request),
        }
    }
}

// ============================================================================
// Synchronous Harness
// ============================================================================

/// Drives one session through the real [`SessionRuntime`], blocking on each
/// event and answering backend calls from an in-memory world.
pub struct Harness {
    runtime: SessionRuntime<MemoryStore, ScriptedBackend, RecordingRenderer>,
    pub store: Arc<MemoryStore>,
    pub backend: Arc<ScriptedBackend>,
    pub renderer: Arc<RecordingRenderer>,
    pub user_id: i64,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_backend(seeded_backend().0, ANNA)
    }

    pub fn with_backend(world: InMemoryBackend, user_id: i64) -> Self {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(ScriptedBackend::new(world));
        let renderer = Arc::new(RecordingRenderer::new());
        // Events are fed directly, never through the channel
        let (_tx, event_rx) = mpsc::channel(1);
        let runtime = SessionRuntime::new(
            user_id,
            store.clone(),
            backend.clone(),
            renderer.clone(),
            event_rx,
            Duration::from_secs(60),
            CancellationToken::new(),
        );
        Self {
            runtime,
            store,
            backend,
            renderer,
            user_id,
        }
    }

    /// Apply one event the way a live session does
    pub fn send(&mut self, event: Event) -> Result<(), TransitionError> {
        futures::executor::block_on(self.runtime.process_event(event))
    }

    pub fn start(&mut self) {
        self.send(Event::Start).unwrap();
    }

    pub fn text(&mut self, text: &str) -> Result<(), TransitionError> {
        self.send(Event::text(text))
    }

    /// Press a button on the current screen
    pub fn press(&mut self, button: Button) -> Result<(), TransitionError> {
        let frame = self.stack().top_id();
        self.send(Event::press(frame, button))
    }

    /// Pick a listed item on the current screen
    pub fn pick(&mut self, id: i64) -> Result<(), TransitionError> {
        let frame = self.stack().top_id();
        self.send(Event::pick(frame, id))
    }

    pub fn stack(&self) -> &Stack {
        self.runtime.stack()
    }

    /// The world behind the scripted backend
    pub fn world(&self) -> &InMemoryBackend {
        self.backend.inner()
    }

    pub fn flows(&self) -> Vec<FlowId> {
        self.stack().flows()
    }

    pub fn screen_count(&self) -> usize {
        self.renderer.screens(self.user_id).len()
    }

    pub fn last_screen(&self) -> Screen {
        self.renderer.last(self.user_id).unwrap()
    }

    pub fn view_text(&self) -> String {
        self.last_screen().view.unwrap().text
    }

    pub fn options(&self) -> Vec<Choice> {
        self.last_screen()
            .view
            .map(|view| view.options)
            .unwrap_or_default()
    }

    pub fn notices(&self) -> Vec<String> {
        self.last_screen().notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{NewManualTask, NewTask};
    use crate::dialog::{Field, Input};
    use chrono::NaiveDate;

    fn trash_duty() -> NewTask {
        NewTask {
            name: "Trash duty".into(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2030, 1, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            period: 7,
            order_id: Some(3),
        }
    }

    /// Home, then the task list, then the wizard's first prompt
    fn in_task_wizard() -> Harness {
        let mut h = Harness::new();
        h.start();
        h.press(Button::Tasks).unwrap();
        h.press(Button::CreateNew).unwrap();
        assert_eq!(
            h.flows(),
            vec![FlowId::Home, FlowId::Tasks, FlowId::CreateTask, FlowId::Prompt]
        );
        h
    }

    #[test]
    fn task_wizard_creates_the_task() {
        let mut h = in_task_wizard();
        h.text("Trash duty").unwrap();
        // An empty answer skips the description
        h.text("").unwrap();
        h.text("01.01.2030 08:00").unwrap();
        h.text("7").unwrap();
        assert_eq!(
            h.flows(),
            vec![
                FlowId::Home,
                FlowId::Tasks,
                FlowId::CreateTask,
                FlowId::OrderSelection
            ]
        );
        assert!(h
            .view_text()
            .contains("2) Boris (@boris_m) - Anna (@anna_k)"));

        h.pick(3).unwrap();

        assert_eq!(h.flows(), vec![FlowId::Home, FlowId::Tasks]);
        assert_eq!(
            h.world().writes(),
            vec![BackendRequest::CreateTask { task: trash_duty() }]
        );
        assert_eq!(h.notices(), ["The task has been created"]);
        assert!(h.options().iter().any(|c| c.label == "Trash duty"));
    }

    #[test]
    fn cancel_at_description_creates_nothing() {
        let mut h = in_task_wizard();
        h.text("Trash duty").unwrap();
        h.press(Button::Cancel).unwrap();

        assert_eq!(h.flows(), vec![FlowId::Home, FlowId::Tasks]);
        assert!(h.world().writes().is_empty());
        assert_eq!(h.notices(), ["Canceled"]);
    }

    #[test]
    fn invalid_date_repeats_the_prompt() {
        let mut h = in_task_wizard();
        h.text("Trash duty").unwrap();
        h.press(Button::Skip).unwrap();
        let prompt = h.stack().top_id();

        h.text("2030-01-01").unwrap();

        assert_eq!(h.stack().depth(), 4);
        assert_eq!(h.stack().top_id(), prompt);
        assert_eq!(h.notices().len(), 1);
        assert!(h.view_text().contains("start date"));
    }

    #[test]
    fn new_order_shows_up_in_the_selection() {
        let mut h = in_task_wizard();
        h.text("Trash duty").unwrap();
        h.press(Button::Skip).unwrap();
        h.text("01.01.2030 08:00").unwrap();
        h.text("7").unwrap();
        let selection = h.stack().top_id();

        h.press(Button::CreateNew).unwrap();
        assert_eq!(h.flows().last(), Some(&FlowId::CreateOrder));
        h.pick(BORIS).unwrap();
        h.press(Button::Finish).unwrap();

        // Back in the same selection frame, now listing the new order
        assert_eq!(h.stack().top_id(), selection);
        let listed: Vec<_> = h
            .options()
            .into_iter()
            .filter_map(|c| match c.input {
                Input::Pick(id) => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(listed, vec![2, 3, 4]);
        assert!(h.view_text().contains("3) Boris (@boris_m)"));
    }

    #[test]
    fn backend_failure_in_wizard_keeps_the_user_in_place() {
        let mut h = in_task_wizard();
        h.text("Trash duty").unwrap();
        h.press(Button::Skip).unwrap();
        h.text("01.01.2030 08:00").unwrap();
        // Leaving the room makes the order listing fail
        h.world().handle(ANNA, &BackendRequest::LeaveRoom).unwrap();
        h.text("7").unwrap();

        assert_eq!(h.flows().last(), Some(&FlowId::OrderSelection));
        assert_eq!(h.notices(), ["1. User doesn't have a room"]);
    }

    #[test]
    fn manual_task_wizard_creates_a_task_that_can_be_done() {
        let mut h = Harness::new();
        h.start();
        h.press(Button::ManualTasks).unwrap();
        h.press(Button::CreateNew).unwrap();
        h.text("Buy soap").unwrap();
        h.text("").unwrap();
        assert_eq!(h.flows().last(), Some(&FlowId::CreateOrder));
        h.pick(ANNA).unwrap();
        h.pick(BORIS).unwrap();
        h.press(Button::Finish).unwrap();

        assert_eq!(h.flows(), vec![FlowId::Home, FlowId::ManualTasks]);
        assert_eq!(
            h.world().writes(),
            vec![
                BackendRequest::CreateOrder {
                    users: vec![ANNA, BORIS]
                },
                BackendRequest::CreateManualTask {
                    task: NewManualTask {
                        name: "Buy soap".into(),
                        description: None,
                        order_id: Some(4),
                    }
                },
            ]
        );
        assert_eq!(h.notices(), ["The task has been created"]);
        let task = h
            .options()
            .into_iter()
            .find(|c| c.label == "[+] Buy soap")
            .unwrap();

        let frame = h.stack().top_id();
        h.send(Event::Input {
            frame,
            input: task.input,
        })
        .unwrap();
        assert!(h.view_text().contains("1) Anna (@anna_k) <- now"));
        h.press(Button::Do).unwrap();

        assert_eq!(h.flows().last(), Some(&FlowId::ManualTaskView));
        assert_eq!(h.notices(), ["Marked as done"]);
        assert!(h.view_text().contains("2) Boris (@boris_m) <- now"));
    }

    #[test]
    fn replacing_a_task_order_deletes_the_old_one() {
        let (world, _) = seeded_backend();
        let task_id = world.add_task(ANNA, &trash_duty()).unwrap();
        let mut h = Harness::with_backend(world, ANNA);
        h.start();
        h.press(Button::Tasks).unwrap();
        h.pick(task_id).unwrap();
        h.press(Button::Edit(Field::Order)).unwrap();
        h.pick(BORIS).unwrap();
        h.press(Button::Finish).unwrap();

        assert_eq!(h.flows().last(), Some(&FlowId::TaskView));
        let ops: Vec<_> = h.backend.calls().iter().map(BackendRequest::op).collect();
        let tail = &ops[ops.len() - 4..];
        assert_eq!(
            tail,
            ["create_order", "modify_task", "delete_order", "get_task_info"]
        );
        assert!(h
            .world()
            .writes()
            .contains(&BackendRequest::DeleteOrder { id: 3 }));
        let Ok(BackendResponse::Orders(orders)) =
            h.world().handle(ANNA, &BackendRequest::ListOrders)
        else {
            panic!("orders should list");
        };
        assert!(!orders.orders.contains_key(&3));
    }

    #[tokio::test]
    async fn scripted_failures_are_used_once() {
        let backend = ScriptedBackend::new(seeded_backend().0);
        backend.fail("list_tasks", BackendError::Transport("down".into()));

        let first = backend.call(ANNA, &BackendRequest::ListTasks).await;
        let second = backend.call(ANNA, &BackendRequest::ListTasks).await;

        assert!(first.is_err());
        assert_eq!(second, Ok(BackendResponse::Tasks(vec![])));
        assert_eq!(backend.calls().len(), 2);
    }
}

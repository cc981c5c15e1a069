//! Single manual task: details, whose turn it is, edits, "done", deletion

use super::create_task::{DESCRIPTION_MAX_LEN, NAME_MAX_LEN};
use super::{ConfirmationArgs, CreateOrderArgs, PromptArgs, Roster, Validator};
use crate::backend::{
    BackendError, BackendRequest, BackendResponse, CurrentExecutor, ManualTaskInfo,
    ManualTaskPatch,
};
use crate::dialog::{
    Button, Field, Flow, FlowCx, FlowId, FlowResult, Input, Intent, Launch, Payload, PayloadKind,
    Step, View,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualTaskViewIntent {
    EditName,
    EditDescription,
    EditOrder,
    Delete,
}

impl Intent for ManualTaskViewIntent {
    fn expects(&self) -> PayloadKind {
        match self {
            Self::EditName | Self::EditDescription => PayloadKind::Text,
            Self::EditOrder => PayloadKind::Id,
            Self::Delete => PayloadKind::Nothing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualTaskView {
    task_id: i64,
    task: Option<ManualTaskInfo>,
    /// Users of the task's order, in turn
    executors: Vec<i64>,
    roster: Roster,
    current: Option<CurrentExecutor>,
    replaced_order: Option<i64>,
}

impl ManualTaskView {
    pub fn new(task_id: i64) -> Self {
        Self {
            task_id,
            task: None,
            executors: Vec::new(),
            roster: Roster::default(),
            current: None,
            replaced_order: None,
        }
    }

    fn reload(&self) -> Step<ManualTaskViewIntent> {
        Step::Call(BackendRequest::GetManualTaskInfo { id: self.task_id })
    }

    fn modify(&self, apply: impl FnOnce(&mut ManualTaskPatch)) -> Step<ManualTaskViewIntent> {
        let mut patch = ManualTaskPatch::new(self.task_id);
        apply(&mut patch);
        Step::Call(BackendRequest::ModifyManualTask { patch })
    }

    fn remove(&self, description: bool, order_id: bool) -> Step<ManualTaskViewIntent> {
        Step::Call(BackendRequest::RemoveManualTaskParameters {
            id: self.task_id,
            description,
            order_id,
        })
    }

    fn replacing_order(&mut self, new_order: Option<i64>) {
        let old = self.task.as_ref().and_then(|t| t.order_id);
        self.replaced_order = old.filter(|old| Some(*old) != new_order);
    }

    /// New task details; the order and the current turn are fetched next
    fn loaded(&mut self, task: ManualTaskInfo) -> Step<ManualTaskViewIntent> {
        let has_order = task.order_id.is_some();
        self.task = Some(task);
        self.executors.clear();
        self.current = None;
        if has_order {
            Step::Call(BackendRequest::ListOrders)
        } else {
            Step::Stay
        }
    }
}

impl Flow for ManualTaskView {
    type Intent = ManualTaskViewIntent;

    const ID: FlowId = FlowId::ManualTaskView;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<Self::Intent> {
        self.reload()
    }

    fn on_input(&mut self, _cx: &mut FlowCx, input: Input) -> Step<Self::Intent> {
        match input {
            Input::Press(Button::Edit(Field::Name)) => Step::push(
                Launch::Prompt(PromptArgs::new(
                    "a new name",
                    Validator::Text {
                        max_len: NAME_MAX_LEN,
                    },
                )),
                ManualTaskViewIntent::EditName,
            ),
            Input::Press(Button::Edit(Field::Description)) => Step::push(
                Launch::Prompt(
                    PromptArgs::new(
                        "a new description",
                        Validator::Text {
                            max_len: DESCRIPTION_MAX_LEN,
                        },
                    )
                    .skippable(),
                ),
                ManualTaskViewIntent::EditDescription,
            ),
            Input::Press(Button::Edit(Field::Order)) => Step::push(
                Launch::CreateOrder(CreateOrderArgs { allow_none: true }),
                ManualTaskViewIntent::EditOrder,
            ),
            Input::Press(Button::Do) if !self.executors.is_empty() => {
                Step::Call(BackendRequest::DoManualTask { id: self.task_id })
            }
            Input::Press(Button::Delete) => Step::push(
                Launch::Confirmation(ConfirmationArgs::new("you want to delete this task")),
                ManualTaskViewIntent::Delete,
            ),
            Input::Press(Button::Refresh) => self.reload(),
            Input::Press(Button::Back | Button::Cancel) => Step::done(Payload::Empty),
            _ => Step::Stay,
        }
    }

    fn on_result(
        &mut self,
        _cx: &mut FlowCx,
        intent: Self::Intent,
        result: FlowResult,
    ) -> Step<Self::Intent> {
        if !result.success {
            return Step::Stay;
        }
        match (intent, result.payload) {
            (ManualTaskViewIntent::EditName, Payload::Text(name)) => {
                self.modify(|p| p.name = Some(name))
            }
            (ManualTaskViewIntent::EditDescription, Payload::Text(text)) => {
                self.modify(|p| p.description = Some(text))
            }
            (ManualTaskViewIntent::EditDescription, _) => self.remove(true, false),
            (ManualTaskViewIntent::EditOrder, Payload::Id(id)) => {
                self.replacing_order(Some(id));
                self.modify(|p| p.order_id = Some(id))
            }
            (ManualTaskViewIntent::EditOrder, _) => {
                self.replacing_order(None);
                self.remove(false, true)
            }
            (ManualTaskViewIntent::Delete, _) => {
                Step::Call(BackendRequest::DeleteManualTask { id: self.task_id })
            }
            (intent, payload) => {
                tracing::warn!(?intent, ?payload, "Unexpected edit result");
                Step::Stay
            }
        }
    }

    fn on_reply(
        &mut self,
        cx: &mut FlowCx,
        request: BackendRequest,
        outcome: Result<BackendResponse, BackendError>,
    ) -> Step<Self::Intent> {
        match (request, outcome) {
            (_, Ok(BackendResponse::ManualTask(task))) => self.loaded(task),
            (_, Ok(BackendResponse::Orders(list))) => {
                let order = self.task.as_ref().and_then(|t| t.order_id);
                self.executors = order
                    .and_then(|id| list.orders.get(&id).cloned())
                    .unwrap_or_default();
                self.roster = Roster::from_users(&list.users);
                if self.executors.is_empty() {
                    Step::Stay
                } else {
                    Step::Call(BackendRequest::CurrentExecutor {
                        task_id: self.task_id,
                    })
                }
            }
            (_, Ok(BackendResponse::Executor(current))) => {
                self.current = Some(current);
                Step::Stay
            }
            (BackendRequest::DoManualTask { .. }, Ok(_)) => {
                cx.notify("Marked as done");
                self.reload()
            }
            (BackendRequest::DeleteManualTask { .. }, Ok(_)) => {
                cx.notify("The task has been deleted");
                Step::done(Payload::Empty)
            }
            (
                BackendRequest::ModifyManualTask { .. }
                | BackendRequest::RemoveManualTaskParameters { .. },
                Ok(_),
            ) => match self.replaced_order.take() {
                Some(id) => Step::Call(BackendRequest::DeleteOrder { id }),
                None => self.reload(),
            },
            (BackendRequest::DeleteOrder { .. }, outcome) => {
                if let Err(e) = outcome {
                    tracing::warn!(task_id = self.task_id, error = %e, "Replaced order was not deleted");
                }
                self.reload()
            }
            (BackendRequest::GetManualTaskInfo { .. }, Err(e)) if self.task.is_none() => {
                cx.notify(e.user_message());
                Step::cancel()
            }
            (_, Err(e)) => {
                self.replaced_order = None;
                cx.notify(e.user_message());
                Step::Stay
            }
            (request, Ok(response)) => {
                tracing::warn!(op = request.op(), ?response, "Unexpected reply in manual task view");
                Step::Stay
            }
        }
    }

    fn view(&self) -> View {
        let Some(task) = &self.task else {
            return View::new("Loading the task...").button("Back", Button::Back);
        };
        let mut view = View::new(format!("Name: {}", task.name));
        if let Some(description) = &task.description {
            view = view.line(format!("Description: {description}"));
        }
        if self.executors.is_empty() {
            view = view.line("Order: none selected");
        } else {
            view = view.line("Order:");
            for (pos, id) in self.executors.iter().enumerate() {
                let marker = if self.current.is_some_and(|c| c.number == pos) {
                    " <- now"
                } else {
                    ""
                };
                view = view.line(format!("{}) {}{marker}", pos + 1, self.roster.name(*id)));
            }
        }
        view = view
            .button("Edit name", Button::Edit(Field::Name))
            .button("Edit description", Button::Edit(Field::Description))
            .button("Delete", Button::Delete)
            .button("Edit order", Button::Edit(Field::Order));
        if !self.executors.is_empty() {
            view = view.button("Do task", Button::Do);
        }
        view.button("Back", Button::Back)
    }
}

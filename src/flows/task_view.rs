//! Single task: details, field edits, deletion

use super::create_task::{DESCRIPTION_MAX_LEN, NAME_MAX_LEN};
use super::{ConfirmationArgs, CreateOrderArgs, PromptArgs, Validator, DATE_FORMAT};
use crate::backend::{BackendError, BackendRequest, BackendResponse, TaskInfo, TaskPatch};
use crate::dialog::{
    Button, Field, Flow, FlowCx, FlowId, FlowResult, Input, Intent, Launch, Payload, PayloadKind,
    Step, View,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskViewIntent {
    Edit(Field),
    Delete,
}

impl Intent for TaskViewIntent {
    fn expects(&self) -> PayloadKind {
        match self {
            Self::Edit(Field::Name | Field::Description) => PayloadKind::Text,
            Self::Edit(Field::StartDate) => PayloadKind::Date,
            Self::Edit(Field::Period) => PayloadKind::Count,
            Self::Edit(Field::Order) => PayloadKind::Id,
            Self::Delete => PayloadKind::Nothing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    task_id: i64,
    task: Option<TaskInfo>,
    /// Order the pending edit replaces; deleted once the task stops using it
    #[serde(default)]
    replaced_order: Option<i64>,
}

impl TaskView {
    pub fn new(task_id: i64) -> Self {
        Self {
            task_id,
            task: None,
            replaced_order: None,
        }
    }

    /// Remember the current order when an edit points the task elsewhere
    fn replacing_order(&mut self, new_order: Option<i64>) {
        let old = self.task.as_ref().and_then(|t| t.order_id);
        self.replaced_order = old.filter(|old| Some(*old) != new_order);
    }

    fn reload(&self) -> Step<TaskViewIntent> {
        Step::Call(BackendRequest::GetTaskInfo { id: self.task_id })
    }

    fn modify(&self, apply: impl FnOnce(&mut TaskPatch)) -> Step<TaskViewIntent> {
        let mut patch = TaskPatch::new(self.task_id);
        apply(&mut patch);
        Step::Call(BackendRequest::ModifyTask { patch })
    }

    fn remove(&self, description: bool, order_id: bool) -> Step<TaskViewIntent> {
        Step::Call(BackendRequest::RemoveTaskParameters {
            id: self.task_id,
            description,
            order_id,
        })
    }

    fn edit(field: Field) -> Step<TaskViewIntent> {
        let launch = match field {
            Field::Name => Launch::Prompt(PromptArgs::new(
                "the new name",
                Validator::Text {
                    max_len: NAME_MAX_LEN,
                },
            )),
            Field::Description => Launch::Prompt(
                PromptArgs::new(
                    "the new description",
                    Validator::Text {
                        max_len: DESCRIPTION_MAX_LEN,
                    },
                )
                .skippable(),
            ),
            Field::StartDate => Launch::Prompt(PromptArgs::new(
                "the new start date (dd.mm.yyyy HH:MM)",
                Validator::DateTime,
            )),
            Field::Period => Launch::Prompt(PromptArgs::new(
                "the new period in days",
                Validator::PositiveInt,
            )),
            Field::Order => Launch::CreateOrder(CreateOrderArgs { allow_none: true }),
        };
        Step::push(launch, TaskViewIntent::Edit(field))
    }
}

impl Flow for TaskView {
    type Intent = TaskViewIntent;

    const ID: FlowId = FlowId::TaskView;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<Self::Intent> {
        self.reload()
    }

    fn on_input(&mut self, _cx: &mut FlowCx, input: Input) -> Step<Self::Intent> {
        match input {
            Input::Press(Button::Edit(field)) => Self::edit(field),
            Input::Press(Button::Delete) => Step::push(
                Launch::Confirmation(ConfirmationArgs::new("you want to delete this task")),
                TaskViewIntent::Delete,
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
            (TaskViewIntent::Edit(Field::Name), Payload::Text(name)) => {
                self.modify(|p| p.name = Some(name))
            }
            (TaskViewIntent::Edit(Field::Description), Payload::Text(text)) => {
                self.modify(|p| p.description = Some(text))
            }
            (TaskViewIntent::Edit(Field::Description), _) => self.remove(true, false),
            (TaskViewIntent::Edit(Field::StartDate), Payload::Date(date)) => {
                self.modify(|p| p.start_date = Some(date))
            }
            (TaskViewIntent::Edit(Field::Period), Payload::Count(days)) => {
                self.modify(|p| p.period = Some(days))
            }
            (TaskViewIntent::Edit(Field::Order), Payload::Id(id)) => {
                self.replacing_order(Some(id));
                self.modify(|p| p.order_id = Some(id))
            }
            (TaskViewIntent::Edit(Field::Order), _) => {
                self.replacing_order(None);
                self.remove(false, true)
            }
            (TaskViewIntent::Delete, _) => {
                Step::Call(BackendRequest::DeleteTask { id: self.task_id })
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
            (_, Ok(BackendResponse::Task(task))) => {
                self.task = Some(task);
                Step::Stay
            }
            (BackendRequest::DeleteTask { .. }, Ok(_)) => {
                cx.notify("The task has been deleted");
                Step::done(Payload::Empty)
            }
            (BackendRequest::ModifyTask { .. } | BackendRequest::RemoveTaskParameters { .. }, Ok(_)) => {
                match self.replaced_order.take() {
                    Some(id) => Step::Call(BackendRequest::DeleteOrder { id }),
                    None => self.reload(),
                }
            }
            (BackendRequest::DeleteOrder { .. }, outcome) => {
                if let Err(e) = outcome {
                    tracing::warn!(task_id = self.task_id, error = %e, "Replaced order was not deleted");
                }
                self.reload()
            }
            // Nothing to show for a task that could not be loaded
            (BackendRequest::GetTaskInfo { .. }, Err(e)) if self.task.is_none() => {
                cx.notify(e.user_message());
                Step::cancel()
            }
            (_, Err(e)) => {
                self.replaced_order = None;
                cx.notify(e.user_message());
                Step::Stay
            }
            (request, Ok(response)) => {
                tracing::warn!(op = request.op(), ?response, "Unexpected reply in task view");
                Step::Stay
            }
        }
    }

    fn view(&self) -> View {
        let Some(task) = &self.task else {
            return View::new("Loading the task...").button("Back", Button::Back);
        };
        let mut view = View::new(format!("Task: {}", task.name));
        if let Some(description) = &task.description {
            view = view.line(format!("Description: {description}"));
        }
        view = view
            .line(format!("Start date: {}", task.start_date.format(DATE_FORMAT)))
            .line(format!("Period: every {} day(s)", task.period));
        view = match task.order_id {
            Some(order) => view.line(format!("Order: #{order}")),
            None => view.line("Order: not set, the task is inactive"),
        };
        view.button("Edit name", Button::Edit(Field::Name))
            .button("Edit description", Button::Edit(Field::Description))
            .button("Edit start date", Button::Edit(Field::StartDate))
            .button("Edit period", Button::Edit(Field::Period))
            .button("Edit order", Button::Edit(Field::Order))
            .button("Delete", Button::Delete)
            .button("Back", Button::Back)
    }
}

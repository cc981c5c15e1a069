//! Periodic task wizard
//!
//! Name, optional description, start date, period in days, then an order
//! picked through [`OrderSelection`](super::OrderSelection). Each answer is
//! written into a typed draft by the step that owns it; the finished draft
//! is the flow's result. Any cancelled child cancels the whole wizard.

use super::{PromptArgs, Validator};
use crate::backend::NewTask;
use crate::dialog::{
    Flow, FlowCx, FlowId, FlowResult, Input, Intent, Launch, Payload, PayloadKind, Step, View,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub(super) const NAME_MAX_LEN: usize = 100;
pub(super) const DESCRIPTION_MAX_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreateTaskIntent {
    EnterName,
    EnterDescription,
    EnterStartDate,
    EnterPeriod,
    SelectOrder,
}

impl Intent for CreateTaskIntent {
    fn expects(&self) -> PayloadKind {
        match self {
            Self::EnterName | Self::EnterDescription => PayloadKind::Text,
            Self::EnterStartDate => PayloadKind::Date,
            Self::EnterPeriod => PayloadKind::Count,
            Self::SelectOrder => PayloadKind::Id,
        }
    }
}

/// Values collected so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub period: Option<u32>,
    pub order_id: Option<i64>,
}

impl TaskDraft {
    fn named(&mut self, name: String) {
        self.name = Some(name);
    }

    fn described(&mut self, description: Option<String>) {
        self.description = description;
    }

    fn starting(&mut self, start_date: NaiveDateTime) {
        self.start_date = Some(start_date);
    }

    fn every(&mut self, days: u32) {
        self.period = Some(days);
    }

    fn ordered(&mut self, order_id: Option<i64>) {
        self.order_id = order_id;
    }

    /// The finished task, once every required value is present
    pub fn complete(&self) -> Option<NewTask> {
        Some(NewTask {
            name: self.name.clone()?,
            description: self.description.clone(),
            start_date: self.start_date?,
            period: self.period?,
            order_id: self.order_id,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    draft: TaskDraft,
}

fn ask(args: PromptArgs, intent: CreateTaskIntent) -> Step<CreateTaskIntent> {
    Step::push(Launch::Prompt(args), intent)
}

impl Flow for CreateTask {
    type Intent = CreateTaskIntent;

    const ID: FlowId = FlowId::CreateTask;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<Self::Intent> {
        ask(
            PromptArgs::new("the task name", Validator::Text { max_len: NAME_MAX_LEN })
                .with_cancel_notice("Canceled"),
            CreateTaskIntent::EnterName,
        )
    }

    fn on_input(&mut self, _cx: &mut FlowCx, input: Input) -> Step<Self::Intent> {
        tracing::debug!(?input, "Task wizard is only driven by its children");
        Step::Stay
    }

    fn on_result(
        &mut self,
        cx: &mut FlowCx,
        intent: Self::Intent,
        result: FlowResult,
    ) -> Step<Self::Intent> {
        if !result.success {
            return Step::cancel();
        }

        match (intent, result.payload) {
            (CreateTaskIntent::EnterName, Payload::Text(name)) => {
                self.draft.named(name);
                ask(
                    PromptArgs::new(
                        "the description",
                        Validator::Text {
                            max_len: DESCRIPTION_MAX_LEN,
                        },
                    )
                    .skippable()
                    .with_cancel_notice("Canceled"),
                    CreateTaskIntent::EnterDescription,
                )
            }
            (CreateTaskIntent::EnterDescription, payload) => {
                self.draft.described(match payload {
                    Payload::Text(text) => Some(text),
                    _ => None,
                });
                ask(
                    PromptArgs::new("the start date (dd.mm.yyyy HH:MM)", Validator::DateTime)
                        .with_cancel_notice("Canceled"),
                    CreateTaskIntent::EnterStartDate,
                )
            }
            (CreateTaskIntent::EnterStartDate, Payload::Date(date)) => {
                self.draft.starting(date);
                ask(
                    PromptArgs::new("the period in days", Validator::PositiveInt)
                        .with_cancel_notice("Canceled"),
                    CreateTaskIntent::EnterPeriod,
                )
            }
            (CreateTaskIntent::EnterPeriod, Payload::Count(days)) => {
                self.draft.every(days);
                Step::push(Launch::OrderSelection, CreateTaskIntent::SelectOrder)
            }
            (CreateTaskIntent::SelectOrder, payload) => {
                self.draft.ordered(match payload {
                    Payload::Id(id) => Some(id),
                    _ => None,
                });
                match self.draft.complete() {
                    Some(task) => Step::done(Payload::Task(task)),
                    None => {
                        tracing::warn!(draft = ?self.draft, "Task wizard finished incomplete");
                        cx.notify("The task is incomplete, please start over");
                        Step::cancel()
                    }
                }
            }
            (intent, payload) => {
                tracing::warn!(?intent, ?payload, "Unexpected wizard answer");
                Step::cancel()
            }
        }
    }

    fn view(&self) -> View {
        View::new("Creating a task...")
    }
}

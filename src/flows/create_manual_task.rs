//! Manual task wizard
//!
//! Name, optional description, then a new order built through
//! [`CreateOrder`](super::CreateOrder). A cancelled child cancels the wizard.

use super::create_task::{DESCRIPTION_MAX_LEN, NAME_MAX_LEN};
use super::{CreateOrderArgs, PromptArgs, Validator};
use crate::backend::NewManualTask;
use crate::dialog::{
    Flow, FlowCx, FlowId, FlowResult, Input, Intent, Launch, Payload, PayloadKind, Step, View,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreateManualTaskIntent {
    EnterName,
    EnterDescription,
    BuildOrder,
}

impl Intent for CreateManualTaskIntent {
    fn expects(&self) -> PayloadKind {
        match self {
            Self::EnterName | Self::EnterDescription => PayloadKind::Text,
            Self::BuildOrder => PayloadKind::Id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateManualTask {
    name: Option<String>,
    description: Option<String>,
}

impl Flow for CreateManualTask {
    type Intent = CreateManualTaskIntent;

    const ID: FlowId = FlowId::CreateManualTask;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<Self::Intent> {
        Step::push(
            Launch::Prompt(
                PromptArgs::new("a name for the task", Validator::Text { max_len: NAME_MAX_LEN })
                    .with_cancel_notice("Canceled"),
            ),
            CreateManualTaskIntent::EnterName,
        )
    }

    fn on_input(&mut self, _cx: &mut FlowCx, input: Input) -> Step<Self::Intent> {
        tracing::debug!(?input, "Manual task wizard is only driven by its children");
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
            (CreateManualTaskIntent::EnterName, Payload::Text(name)) => {
                self.name = Some(name);
                Step::push(
                    Launch::Prompt(
                        PromptArgs::new(
                            "a description",
                            Validator::Text {
                                max_len: DESCRIPTION_MAX_LEN,
                            },
                        )
                        .skippable()
                        .with_cancel_notice("Canceled"),
                    ),
                    CreateManualTaskIntent::EnterDescription,
                )
            }
            (CreateManualTaskIntent::EnterDescription, payload) => {
                self.description = match payload {
                    Payload::Text(text) => Some(text),
                    _ => None,
                };
                Step::push(
                    Launch::CreateOrder(CreateOrderArgs { allow_none: true }),
                    CreateManualTaskIntent::BuildOrder,
                )
            }
            (CreateManualTaskIntent::BuildOrder, payload) => {
                let order_id = match payload {
                    Payload::Id(id) => Some(id),
                    _ => None,
                };
                let Some(name) = self.name.clone() else {
                    tracing::warn!(wizard = ?self, "Manual task wizard finished without a name");
                    cx.notify("The task is incomplete, please start over");
                    return Step::cancel();
                };
                Step::done(Payload::ManualTask(NewManualTask {
                    name,
                    description: self.description.clone(),
                    order_id,
                }))
            }
            (intent, payload) => {
                tracing::warn!(?intent, ?payload, "Unexpected wizard answer");
                Step::cancel()
            }
        }
    }

    fn view(&self) -> View {
        View::new("Creating a manual task...")
    }
}

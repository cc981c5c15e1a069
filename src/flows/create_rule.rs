//! Two-question rule wizard: name, then text

use super::{PromptArgs, Validator};
use crate::backend::NewRule;
use crate::dialog::{
    Flow, FlowCx, FlowId, FlowResult, Input, Intent, Launch, Payload, PayloadKind, Step, View,
};
use serde::{Deserialize, Serialize};

const NAME_MAX_LEN: usize = 100;
const TEXT_MAX_LEN: usize = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreateRuleIntent {
    EnterName,
    EnterText,
}

impl Intent for CreateRuleIntent {
    fn expects(&self) -> PayloadKind {
        PayloadKind::Text
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRule {
    name: Option<String>,
}

impl Flow for CreateRule {
    type Intent = CreateRuleIntent;

    const ID: FlowId = FlowId::CreateRule;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<Self::Intent> {
        Step::push(
            Launch::Prompt(PromptArgs::new(
                "a name for the rule",
                Validator::Text {
                    max_len: NAME_MAX_LEN,
                },
            )),
            CreateRuleIntent::EnterName,
        )
    }

    fn on_input(&mut self, _cx: &mut FlowCx, _input: Input) -> Step<Self::Intent> {
        Step::Stay
    }

    fn on_result(
        &mut self,
        _cx: &mut FlowCx,
        intent: Self::Intent,
        result: FlowResult,
    ) -> Step<Self::Intent> {
        let (true, Payload::Text(value)) = (result.success, result.payload) else {
            return Step::cancel();
        };
        match intent {
            CreateRuleIntent::EnterName => {
                self.name = Some(value);
                Step::push(
                    Launch::Prompt(PromptArgs::new(
                        "the rule text",
                        Validator::Text {
                            max_len: TEXT_MAX_LEN,
                        },
                    )),
                    CreateRuleIntent::EnterText,
                )
            }
            CreateRuleIntent::EnterText => match self.name.take() {
                Some(name) => Step::done(Payload::Rule(NewRule { name, text: value })),
                None => Step::cancel(),
            },
        }
    }

    fn view(&self) -> View {
        View::new("Creating a rule...")
    }
}

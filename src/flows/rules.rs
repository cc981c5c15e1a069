//! Room rules: list, read one, add, delete

use super::ConfirmationArgs;
use crate::backend::{BackendError, BackendRequest, BackendResponse, RuleInfo};
use crate::dialog::{
    Button, Flow, FlowCx, FlowId, FlowResult, Input, Intent, Launch, Payload, PayloadKind, Step,
    View,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RulesIntent {
    NewRule,
    DeleteRule { id: i64 },
}

impl Intent for RulesIntent {
    fn expects(&self) -> PayloadKind {
        match self {
            Self::NewRule => PayloadKind::Rule,
            Self::DeleteRule { .. } => PayloadKind::Nothing,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rules {
    rules: Vec<RuleInfo>,
    /// Rule opened for reading
    selected: Option<i64>,
}

impl Rules {
    fn selected_rule(&self) -> Option<&RuleInfo> {
        let id = self.selected?;
        self.rules.iter().find(|r| r.id == id)
    }
}

impl Flow for Rules {
    type Intent = RulesIntent;

    const ID: FlowId = FlowId::Rules;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<Self::Intent> {
        Step::Call(BackendRequest::ListRules)
    }

    fn on_input(&mut self, _cx: &mut FlowCx, input: Input) -> Step<Self::Intent> {
        match input {
            Input::Pick(id) if self.rules.iter().any(|r| r.id == id) => {
                self.selected = Some(id);
                Step::Stay
            }
            Input::Press(Button::CreateNew) => Step::push(Launch::CreateRule, RulesIntent::NewRule),
            Input::Press(Button::Delete) => match self.selected {
                Some(id) => Step::push(
                    Launch::Confirmation(
                        ConfirmationArgs::new("you want to delete the rule")
                            .on_yes("The rule has been deleted"),
                    ),
                    RulesIntent::DeleteRule { id },
                ),
                None => Step::Stay,
            },
            Input::Press(Button::Back) if self.selected.is_some() => {
                self.selected = None;
                Step::Stay
            }
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
            (RulesIntent::NewRule, Payload::Rule(rule)) => {
                Step::Call(BackendRequest::CreateRule { rule })
            }
            (RulesIntent::DeleteRule { id }, _) => Step::Call(BackendRequest::DeleteRule { id }),
            (intent, payload) => {
                tracing::warn!(?intent, ?payload, "Unexpected rules result");
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
            (_, Ok(BackendResponse::Rules(rules))) => {
                self.rules = rules;
                if self.selected_rule().is_none() {
                    self.selected = None;
                }
                Step::Stay
            }
            (BackendRequest::CreateRule { .. }, Ok(_)) => {
                cx.notify("The rule has been added");
                Step::Call(BackendRequest::ListRules)
            }
            (BackendRequest::DeleteRule { .. }, Ok(_)) => {
                self.selected = None;
                Step::Call(BackendRequest::ListRules)
            }
            (_, Err(e)) => {
                cx.notify(e.user_message());
                Step::Stay
            }
            (request, Ok(response)) => {
                tracing::warn!(op = request.op(), ?response, "Unexpected reply in rules");
                Step::Stay
            }
        }
    }

    fn view(&self) -> View {
        if let Some(rule) = self.selected_rule() {
            return View::new(rule.name.clone())
                .line("")
                .line(&rule.text)
                .button("Delete", Button::Delete)
                .button("Back", Button::Back);
        }
        let mut view = View::new(if self.rules.is_empty() {
            "There are no rules yet"
        } else {
            "Rules:"
        });
        for rule in &self.rules {
            view = view.item(rule.name.clone(), rule.id);
        }
        view.button("Add a new rule", Button::CreateNew)
            .button("Back", Button::Back)
    }
}

//! Yes/no confirmation

use crate::dialog::{Button, Flow, FlowCx, FlowId, FlowResult, Input, NoChild, Payload, Step, View};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationArgs {
    /// Completes "Are you sure ...?"
    pub question: String,
    pub yes_notice: Option<String>,
    pub no_notice: Option<String>,
}

impl ConfirmationArgs {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            yes_notice: None,
            no_notice: Some("Canceled".into()),
        }
    }

    pub fn on_yes(mut self, notice: impl Into<String>) -> Self {
        self.yes_notice = Some(notice.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confirmation {
    args: ConfirmationArgs,
}

impl Confirmation {
    pub fn new(args: ConfirmationArgs) -> Self {
        Self { args }
    }
}

impl Flow for Confirmation {
    type Intent = NoChild;

    const ID: FlowId = FlowId::Confirmation;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<NoChild> {
        Step::Stay
    }

    fn on_input(&mut self, cx: &mut FlowCx, input: Input) -> Step<NoChild> {
        match input {
            Input::Press(Button::Yes) => {
                if let Some(notice) = &self.args.yes_notice {
                    cx.notify(notice.clone());
                }
                Step::done(Payload::Empty)
            }
            Input::Press(Button::No | Button::Cancel | Button::Back) => {
                if let Some(notice) = &self.args.no_notice {
                    cx.notify(notice.clone());
                }
                Step::cancel()
            }
            _ => Step::Stay,
        }
    }

    fn on_result(&mut self, _cx: &mut FlowCx, intent: NoChild, _result: FlowResult) -> Step<NoChild> {
        match intent {}
    }

    fn view(&self) -> View {
        View::new(format!("Are you sure {}?", self.args.question))
            .button("Yes", Button::Yes)
            .button("No", Button::No)
    }
}

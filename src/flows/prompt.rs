//! Text prompt: asks for one value, validates it, returns it

use crate::dialog::{Button, Flow, FlowCx, FlowId, FlowResult, Input, NoChild, Payload, Step, View};
use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Input format for dates and times
pub const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

static ALIAS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@?([a-z][a-z0-9_]{4,31})$").expect("Invalid alias pattern"));

/// How raw text becomes a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// Free text up to a length limit
    Text { max_len: usize },
    /// A date and time in [`DATE_FORMAT`]
    DateTime,
    /// A whole number greater than zero
    PositiveInt,
    /// A user alias, with or without the leading `@`
    Alias,
}

impl Validator {
    /// Parse `text` into a payload, or explain why it was rejected
    pub fn check(&self, text: &str) -> Result<Payload, String> {
        match self {
            Self::Text { max_len } => {
                if text.chars().count() > *max_len {
                    Err(format!("Too long, at most {max_len} characters"))
                } else {
                    Ok(Payload::Text(text.to_string()))
                }
            }
            Self::DateTime => NaiveDateTime::parse_from_str(text, DATE_FORMAT)
                .map(Payload::Date)
                .map_err(|_| "Expected a date like 31.12.2030 18:00".to_string()),
            Self::PositiveInt => match text.parse::<u32>() {
                Ok(n) if n > 0 => Ok(Payload::Count(n)),
                _ => Err("Expected a positive whole number".to_string()),
            },
            Self::Alias => ALIAS_PATTERN
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|alias| Payload::Text(alias.as_str().to_string()))
                .ok_or_else(|| {
                    "Expected an alias of 5-32 lowercase letters, digits or underscores".to_string()
                }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgs {
    /// Completes "Enter ..."
    pub subject: String,
    pub validator: Validator,
    pub can_skip: bool,
    /// Sent when the user cancels
    pub cancel_notice: Option<String>,
}

impl PromptArgs {
    pub fn new(subject: impl Into<String>, validator: Validator) -> Self {
        Self {
            subject: subject.into(),
            validator,
            can_skip: false,
            cancel_notice: None,
        }
    }

    pub fn skippable(mut self) -> Self {
        self.can_skip = true;
        self
    }

    pub fn with_cancel_notice(mut self, notice: impl Into<String>) -> Self {
        self.cancel_notice = Some(notice.into());
        self
    }
}

/// Prompt flow. Holds no mutable state: a rejected value leaves the frame
/// exactly as it was.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    args: PromptArgs,
}

impl Prompt {
    pub fn new(args: PromptArgs) -> Self {
        Self { args }
    }

    fn skip(&self) -> Step<NoChild> {
        Step::Finish(FlowResult::done(Payload::Empty))
    }
}

impl Flow for Prompt {
    type Intent = NoChild;

    const ID: FlowId = FlowId::Prompt;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<NoChild> {
        Step::Stay
    }

    fn on_input(&mut self, cx: &mut FlowCx, input: Input) -> Step<NoChild> {
        match input {
            Input::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    if self.args.can_skip {
                        return self.skip();
                    }
                    cx.notify("The value can't be empty");
                    return Step::Stay;
                }
                match self.args.validator.check(text) {
                    Ok(payload) => Step::done(payload),
                    Err(reason) => {
                        cx.notify(reason);
                        Step::Stay
                    }
                }
            }
            Input::Press(Button::Skip) if self.args.can_skip => self.skip(),
            Input::Press(Button::Cancel | Button::Back) => {
                if let Some(notice) = &self.args.cancel_notice {
                    cx.notify(notice.clone());
                }
                Step::cancel()
            }
            Input::Press(_) | Input::Pick(_) => Step::Stay,
        }
    }

    fn on_result(&mut self, _cx: &mut FlowCx, intent: NoChild, _result: FlowResult) -> Step<NoChild> {
        match intent {}
    }

    fn view(&self) -> View {
        let view = View::new(format!("Enter {}", self.args.subject)).accepting_text();
        let view = if self.args.can_skip {
            view.button("Skip", Button::Skip)
        } else {
            view
        };
        view.button("Cancel", Button::Cancel)
    }
}

//! What the renderer gets to see

use super::event::{Button, Input};
use super::stack::{FrameId, Stack};

/// Rendering of one frame: text plus the inputs it offers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub text: String,
    pub options: Vec<Choice>,
    /// Whether free text is a meaningful answer
    pub accepts_text: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub input: Input,
}

impl View {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: Vec::new(),
            accepts_text: false,
        }
    }

    pub fn button(mut self, label: impl Into<String>, button: Button) -> Self {
        self.options.push(Choice {
            label: label.into(),
            input: Input::Press(button),
        });
        self
    }

    pub fn item(mut self, label: impl Into<String>, id: i64) -> Self {
        self.options.push(Choice {
            label: label.into(),
            input: Input::Pick(id),
        });
        self
    }

    pub fn line(mut self, line: impl AsRef<str>) -> Self {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(line.as_ref());
        self
    }

    pub fn accepting_text(mut self) -> Self {
        self.accepts_text = true;
        self
    }
}

/// Everything rendered for one settled state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Screen {
    /// Frame the view belongs to; inputs from this screen carry it
    pub frame: Option<FrameId>,
    pub notices: Vec<String>,
    pub view: Option<View>,
}

impl Screen {
    pub fn of(stack: &Stack, notices: Vec<String>) -> Self {
        Self {
            frame: stack.top().map(|f| f.ops().id()),
            notices,
            view: stack.top().map(|f| f.ops().view()),
        }
    }
}

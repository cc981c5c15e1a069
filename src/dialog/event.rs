//! Events entering the dialog engine

use super::stack::FrameId;
use crate::backend::{BackendError, BackendResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Reset the session to the root flow
    Start,

    /// Raw input for the topmost frame. `frame` is the frame the input was
    /// rendered for, when known; input for any other frame is stale.
    Input { frame: Option<FrameId>, input: Input },

    /// Outcome of the backend call issued by `frame`
    BackendReply {
        frame: FrameId,
        outcome: Result<BackendResponse, BackendError>,
    },
}

impl Event {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Input {
            frame: None,
            input: Input::Text(text.into()),
        }
    }

    pub fn press(frame: Option<FrameId>, button: Button) -> Self {
        Self::Input {
            frame,
            input: Input::Press(button),
        }
    }

    pub fn pick(frame: Option<FrameId>, id: i64) -> Self {
        Self::Input {
            frame,
            input: Input::Pick(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Text(String),
    Press(Button),
    /// Choice of a listed item by its id
    Pick(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Cancel,
    Skip,
    CreateNew,
    Finish,
    Yes,
    No,
    Back,
    Refresh,
    Roommates,
    Tasks,
    ManualTasks,
    Rules,
    Invitations,
    Leave,
    Delete,
    Accept,
    Reject,
    /// Mark a manual task as done by the current executor
    Do,
    Edit(Field),
}

/// Editable task attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Name,
    Description,
    StartDate,
    Period,
    Order,
}

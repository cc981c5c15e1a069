//! Flow definitions: the contract every dialog implements

use super::registry::{FlowId, Launch};
use super::view::View;
use super::Input;
use crate::backend::{
    BackendError, BackendRequest, BackendResponse, NewManualTask, NewRule, NewTask,
};
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One dialog. A running instance lives inside a frame on the stack and
/// owns its collected values as ordinary typed fields.
pub trait Flow: Clone + fmt::Debug + Serialize + DeserializeOwned {
    /// Why this flow is waiting on a child
    type Intent: Intent;

    const ID: FlowId;

    /// Called once right after the frame is pushed
    fn on_start(&mut self, cx: &mut FlowCx) -> Step<Self::Intent>;

    /// Direct input while this frame is on top
    fn on_input(&mut self, cx: &mut FlowCx, input: Input) -> Step<Self::Intent>;

    /// Resumption with the result of the child started under `intent`
    fn on_result(
        &mut self,
        cx: &mut FlowCx,
        intent: Self::Intent,
        result: FlowResult,
    ) -> Step<Self::Intent>;

    /// Outcome of a backend call this frame asked for
    fn on_reply(
        &mut self,
        cx: &mut FlowCx,
        request: BackendRequest,
        outcome: Result<BackendResponse, BackendError>,
    ) -> Step<Self::Intent> {
        match outcome {
            Ok(response) => {
                tracing::warn!(flow = %Self::ID, op = request.op(), ?response, "Unhandled backend reply");
            }
            Err(e) => cx.notify(e.user_message()),
        }
        Step::Stay
    }

    fn view(&self) -> View;
}

/// Pending-child tag. Each variant names the payload kind it can be resumed with.
pub trait Intent: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned {
    fn expects(&self) -> PayloadKind;
}

/// Intent of flows that never start children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoChild {}

impl Intent for NoChild {
    fn expects(&self) -> PayloadKind {
        match *self {}
    }
}

/// What a handler wants the engine to do next
#[derive(Debug, Clone, PartialEq)]
pub enum Step<I> {
    /// Keep this frame on top and re-render it
    Stay,
    /// Start a child flow; this frame resumes under `intent` when it finishes
    Push { launch: Launch, intent: I },
    /// Call the backend; the reply comes back through `on_reply`
    Call(BackendRequest),
    /// Pop this frame and hand the result to the parent
    Finish(FlowResult),
}

impl<I> Step<I> {
    pub fn cancel() -> Self {
        Self::Finish(FlowResult::cancelled())
    }

    pub fn done(payload: Payload) -> Self {
        Self::Finish(FlowResult::done(payload))
    }

    pub fn push(launch: Launch, intent: I) -> Self {
        Self::Push { launch, intent }
    }
}

/// Final value of a frame, delivered to its parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowResult {
    pub success: bool,
    pub payload: Payload,
}

impl FlowResult {
    pub fn done(payload: Payload) -> Self {
        Self {
            success: true,
            payload,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            success: false,
            payload: Payload::Empty,
        }
    }
}

/// Value carried by a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Empty,
    Text(String),
    Id(i64),
    Date(NaiveDateTime),
    Count(u32),
    Task(NewTask),
    ManualTask(NewManualTask),
    Rule(NewRule),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Empty => PayloadKind::Nothing,
            Self::Text(_) => PayloadKind::Text,
            Self::Id(_) => PayloadKind::Id,
            Self::Date(_) => PayloadKind::Date,
            Self::Count(_) => PayloadKind::Count,
            Self::Task(_) => PayloadKind::Task,
            Self::ManualTask(_) => PayloadKind::ManualTask,
            Self::Rule(_) => PayloadKind::Rule,
        }
    }
}

/// Payload shape an intent accepts on success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadKind {
    Nothing,
    Text,
    Id,
    Date,
    Count,
    Task,
    ManualTask,
    Rule,
}

impl PayloadKind {
    /// Text and id results may also be empty ("skip", "leave empty")
    pub fn accepts(self, payload: &Payload) -> bool {
        let got = payload.kind();
        got == self || (got == Self::Nothing && matches!(self, Self::Text | Self::Id))
    }
}

/// Side channel handlers use to emit notices alongside the next render
#[derive(Debug, Default)]
pub struct FlowCx {
    notices: Vec<String>,
}

impl FlowCx {
    pub fn notify(&mut self, text: impl Into<String>) {
        self.notices.push(text.into());
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }
}

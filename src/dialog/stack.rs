//! Frames and the per-session stack
//!
//! A frame is a running flow plus its correlation slots: the intent it is
//! suspended under while a child runs, and the backend request it is
//! waiting on. The stack only changes through `push` and `finish`, each of
//! which moves the depth by exactly one.

use super::flow::{Flow, FlowCx, FlowResult, Intent, Step};
use super::registry::{AnyFrame, FlowId, Launch};
use super::transition::TransitionError;
use super::view::View;
use super::Input;
use crate::backend::{BackendError, BackendRequest, BackendResponse};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type-erased step, as seen by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Stay,
    Push(Launch),
    Call(BackendRequest),
    Finish(FlowResult),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Frame<F: Flow> {
    pub id: FrameId,
    pub flow: F,
    /// Set iff a child of this frame is running
    pub pending: Option<F::Intent>,
    /// Set while a backend call issued by this frame is outstanding
    pub awaiting: Option<BackendRequest>,
}

impl<F: Flow> Frame<F> {
    pub fn new(id: FrameId, flow: F) -> Self {
        Self {
            id,
            flow,
            pending: None,
            awaiting: None,
        }
    }

    /// Record the correlation slots a step implies and erase its type
    fn apply(&mut self, step: Step<F::Intent>) -> Result<Command, TransitionError> {
        match step {
            Step::Stay => Ok(Command::Stay),
            Step::Push { launch, intent } => {
                if let Some(existing) = &self.pending {
                    return Err(TransitionError::InvariantViolation(format!(
                        "{} frame {} started a second child while waiting on {existing:?}",
                        F::ID,
                        self.id
                    )));
                }
                self.pending = Some(intent);
                Ok(Command::Push(launch))
            }
            Step::Call(request) => {
                self.awaiting = Some(request.clone());
                Ok(Command::Call(request))
            }
            Step::Finish(result) => Ok(Command::Finish(result)),
        }
    }
}

/// Uniform access to frames of any flow
pub trait FrameOps {
    fn id(&self) -> FrameId;
    fn flow_id(&self) -> FlowId;
    fn has_pending(&self) -> bool;
    fn awaiting(&self) -> Option<&BackendRequest>;
    fn view(&self) -> View;

    fn start(&mut self, cx: &mut FlowCx) -> Result<Command, TransitionError>;
    fn input(&mut self, cx: &mut FlowCx, input: Input) -> Result<Command, TransitionError>;
    fn resume(&mut self, cx: &mut FlowCx, result: FlowResult) -> Result<Command, TransitionError>;
    fn reply(
        &mut self,
        cx: &mut FlowCx,
        outcome: Result<BackendResponse, BackendError>,
    ) -> Result<Command, TransitionError>;
}

impl<F: Flow> FrameOps for Frame<F> {
    fn id(&self) -> FrameId {
        self.id
    }

    fn flow_id(&self) -> FlowId {
        F::ID
    }

    fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn awaiting(&self) -> Option<&BackendRequest> {
        self.awaiting.as_ref()
    }

    fn view(&self) -> View {
        self.flow.view()
    }

    fn start(&mut self, cx: &mut FlowCx) -> Result<Command, TransitionError> {
        let step = self.flow.on_start(cx);
        self.apply(step)
    }

    fn input(&mut self, cx: &mut FlowCx, input: Input) -> Result<Command, TransitionError> {
        if self.pending.is_some() {
            return Err(TransitionError::InvariantViolation(format!(
                "{} frame {} received input while a child is running",
                F::ID,
                self.id
            )));
        }
        if self.awaiting.is_some() {
            return Err(TransitionError::Busy(F::ID));
        }
        let step = self.flow.on_input(cx, input);
        self.apply(step)
    }

    fn resume(&mut self, cx: &mut FlowCx, result: FlowResult) -> Result<Command, TransitionError> {
        let Some(intent) = self.pending.take() else {
            return Err(TransitionError::InvariantViolation(format!(
                "{} frame {} resumed without a pending child",
                F::ID,
                self.id
            )));
        };
        let expected = intent.expects();
        if result.success && !expected.accepts(&result.payload) {
            return Err(TransitionError::ReplyMismatch {
                flow: F::ID,
                expected,
                got: result.payload.kind(),
            });
        }
        let step = self.flow.on_result(cx, intent, result);
        self.apply(step)
    }

    fn reply(
        &mut self,
        cx: &mut FlowCx,
        outcome: Result<BackendResponse, BackendError>,
    ) -> Result<Command, TransitionError> {
        let Some(request) = self.awaiting.take() else {
            return Err(TransitionError::UnexpectedReply(self.id));
        };
        let step = self.flow.on_reply(cx, request, outcome);
        self.apply(step)
    }
}

/// Ordered frames of one session; the last one is active
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stack {
    frames: Vec<AnyFrame>,
    next_id: u64,
}

impl Stack {
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn top(&self) -> Option<&AnyFrame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut AnyFrame> {
        self.frames.last_mut()
    }

    pub fn top_id(&self) -> Option<FrameId> {
        self.top().map(|f| f.ops().id())
    }

    /// Flow ids from root to top
    pub fn flows(&self) -> Vec<FlowId> {
        self.frames.iter().map(|f| f.ops().flow_id()).collect()
    }

    /// Drop every frame. Ids keep increasing so old references stay stale.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Append a frame for `launch` and run its `on_start`.
    ///
    /// The caller, if any, must already be suspended under an intent.
    pub fn push(&mut self, cx: &mut FlowCx, launch: Launch) -> Result<Command, TransitionError> {
        if let Some(caller) = self.top() {
            if !caller.ops().has_pending() {
                return Err(TransitionError::InvariantViolation(format!(
                    "{} frame {} pushed a child without a pending intent",
                    caller.ops().flow_id(),
                    caller.ops().id()
                )));
            }
        }
        self.next_id += 1;
        let frame = launch.instantiate(FrameId(self.next_id));
        tracing::debug!(flow = %frame.ops().flow_id(), frame = %frame.ops().id(), depth = self.depth() + 1, "Pushing frame");
        self.frames.push(frame);
        match self.top_mut() {
            Some(top) => top.ops_mut().start(cx),
            None => Err(TransitionError::InvariantViolation(
                "stack empty right after push".into(),
            )),
        }
    }

    /// Pop `frame`, which must be on top, and resume its parent with `result`.
    ///
    /// Returns `None` when the popped frame was the root.
    pub fn finish(
        &mut self,
        cx: &mut FlowCx,
        frame: FrameId,
        result: FlowResult,
    ) -> Result<Option<Command>, TransitionError> {
        let top = self.top_id();
        if top != Some(frame) {
            return Err(TransitionError::StaleFrame {
                requested: frame,
                top,
            });
        }
        let finished = self.frames.pop();
        if let Some(finished) = &finished {
            tracing::debug!(
                flow = %finished.ops().flow_id(),
                frame = %frame,
                success = result.success,
                depth = self.depth(),
                "Frame finished"
            );
        }
        match self.top_mut() {
            Some(parent) => parent.ops_mut().resume(cx, result).map(Some),
            None => Ok(None),
        }
    }

    /// Every non-top frame waits on a child, the top frame does not, and
    /// frame ids increase towards the top.
    pub fn check_invariants(&self) -> Result<(), TransitionError> {
        let last = self.frames.len().saturating_sub(1);
        let mut previous: Option<FrameId> = None;
        for (index, frame) in self.frames.iter().enumerate() {
            let ops = frame.ops();
            let is_top = index == last;
            if ops.has_pending() == is_top {
                return Err(TransitionError::InvariantViolation(format!(
                    "{} frame {} at depth {} has pending={} but top={is_top}",
                    ops.flow_id(),
                    ops.id(),
                    index + 1,
                    ops.has_pending()
                )));
            }
            if !is_top && ops.awaiting().is_some() {
                return Err(TransitionError::InvariantViolation(format!(
                    "suspended frame {} is waiting on the backend",
                    ops.id()
                )));
            }
            if previous.is_some_and(|p| p >= ops.id()) || ops.id().0 > self.next_id {
                return Err(TransitionError::InvariantViolation(format!(
                    "frame id {} out of order",
                    ops.id()
                )));
            }
            previous = Some(ops.id());
        }
        Ok(())
    }
}

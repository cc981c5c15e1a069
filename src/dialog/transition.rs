//! Pure transition function
//!
//! Given the current stack and one event, compute the next stack and the
//! effects the runtime has to execute. No I/O happens here.

use super::flow::{FlowCx, PayloadKind};
use super::registry::{FlowId, Launch};
use super::stack::{Command, FrameId, Stack};
use super::{Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_stack: Stack,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(stack: Stack) -> Self {
        Self {
            new_stack: stack,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("frame {requested} is not active (top is {top:?})")]
    StaleFrame {
        requested: FrameId,
        top: Option<FrameId>,
    },
    #[error("no active flow for this session")]
    NoActiveFlow,
    #[error("{0} is waiting for the backend")]
    Busy(FlowId),
    #[error("frame {0} got a backend reply it did not ask for")]
    UnexpectedReply(FrameId),
    #[error("{flow} expected a {expected:?} result, got {got:?}")]
    ReplyMismatch {
        flow: FlowId,
        expected: PayloadKind,
        got: PayloadKind,
    },
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl TransitionError {
    /// Programming errors; the event is aborted and the stack left untouched
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedReply(_) | Self::ReplyMismatch { .. } | Self::InvariantViolation(_)
        )
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::StaleFrame { .. } => {
                "This menu is no longer active. Send /start to begin again."
            }
            Self::NoActiveFlow => "I don't know where we left off. Send /start to begin.",
            Self::Busy(_) => "Still working on your previous request.",
            Self::UnexpectedReply(_) | Self::ReplyMismatch { .. } | Self::InvariantViolation(_) => {
                "Something went wrong. Please try again."
            }
        }
    }
}

/// Pure transition function
pub fn transition(stack: &Stack, event: Event) -> Result<TransitionResult, TransitionError> {
    let mut stack = stack.clone();
    let mut cx = FlowCx::default();

    let command = match event {
        Event::Start => {
            stack.clear();
            stack.push(&mut cx, Launch::Home)?
        }

        Event::Input { frame, input } => {
            let top = stack.top_mut().ok_or(TransitionError::NoActiveFlow)?;
            let top_id = top.ops().id();
            if let Some(requested) = frame {
                if requested != top_id {
                    return Err(TransitionError::StaleFrame {
                        requested,
                        top: Some(top_id),
                    });
                }
            }
            top.ops_mut().input(&mut cx, input)?
        }

        Event::BackendReply { frame, outcome } => {
            let top = stack
                .top_mut()
                .ok_or(TransitionError::UnexpectedReply(frame))?;
            if top.ops().id() != frame {
                return Err(TransitionError::UnexpectedReply(frame));
            }
            top.ops_mut().reply(&mut cx, outcome)?
        }
    };

    let call = settle(&mut stack, &mut cx, command)?;
    stack.check_invariants()?;

    let notices = cx.take_notices().into_iter().map(Effect::Notify);
    let result = TransitionResult::new(stack).with_effects(notices);

    Ok(match call {
        Some(effect) => result.with_effect(effect),
        None => result
            .with_effect(Effect::PersistStack)
            .with_effect(Effect::Render),
    })
}

/// Run commands until the stack is settled or waiting on the backend.
///
/// Returns the backend call to make, if any.
fn settle(
    stack: &mut Stack,
    cx: &mut FlowCx,
    mut command: Command,
) -> Result<Option<Effect>, TransitionError> {
    loop {
        command = match command {
            Command::Stay => return Ok(None),
            Command::Call(request) => {
                let frame = stack.top_id().ok_or(TransitionError::NoActiveFlow)?;
                return Ok(Some(Effect::CallBackend { frame, request }));
            }
            Command::Push(launch) => stack.push(cx, launch)?,
            Command::Finish(result) => {
                let frame = stack.top_id().ok_or(TransitionError::NoActiveFlow)?;
                match stack.finish(cx, frame, result)? {
                    Some(next) => next,
                    None => return Ok(None),
                }
            }
        };
    }
}

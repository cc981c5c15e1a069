//! Dialog engine
//!
//! Elm-style core: a session's [`Stack`] of frames is advanced by the pure
//! [`transition`] function, which returns the effects (backend calls,
//! persistence, rendering) for the runtime to carry out.

mod effect;
pub mod event;
pub mod flow;
pub mod registry;
pub mod stack;
pub(crate) mod transition;
pub mod view;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Button, Event, Field, Input};
pub use flow::{Flow, FlowCx, FlowResult, Intent, NoChild, Payload, PayloadKind, Step};
pub use registry::{FlowId, Launch};
pub use stack::{FrameId, Stack};
pub use transition::{transition, TransitionError};
pub use view::{Choice, Screen, View};

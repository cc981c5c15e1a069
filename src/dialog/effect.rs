//! Effects produced by transitions

use super::stack::FrameId;
use crate::backend::BackendRequest;

/// Work the runtime performs after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Execute a backend call and feed the reply back as an event
    CallBackend {
        frame: FrameId,
        request: BackendRequest,
    },

    /// Show a one-off message with the next render
    Notify(String),

    /// Save the settled stack
    PersistStack,

    /// Render the top frame
    Render,
}

//! Flow registry: identifiers, start requests and the closed set of frame types

use super::stack::{Frame, FrameId, FrameOps};
use crate::flows::{
    Confirmation, ConfirmationArgs, CreateManualTask, CreateOrder, CreateOrderArgs, CreateRule,
    CreateTask, Home, IncomingInvitations, ManualTaskView, ManualTasks, OrderSelection,
    OutgoingInvitations, Prompt, PromptArgs, Rules, TaskView, Tasks,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowId {
    Home,
    Prompt,
    Confirmation,
    OrderSelection,
    CreateOrder,
    CreateTask,
    Tasks,
    TaskView,
    ManualTasks,
    CreateManualTask,
    ManualTaskView,
    CreateRule,
    Rules,
    OutgoingInvitations,
    IncomingInvitations,
}

impl FlowId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Prompt => "prompt",
            Self::Confirmation => "confirmation",
            Self::OrderSelection => "order_selection",
            Self::CreateOrder => "create_order",
            Self::CreateTask => "create_task",
            Self::Tasks => "tasks",
            Self::TaskView => "task_view",
            Self::ManualTasks => "manual_tasks",
            Self::CreateManualTask => "create_manual_task",
            Self::ManualTaskView => "manual_task_view",
            Self::CreateRule => "create_rule",
            Self::Rules => "rules",
            Self::OutgoingInvitations => "outgoing_invitations",
            Self::IncomingInvitations => "incoming_invitations",
        }
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to start a flow, carrying its start input
#[derive(Debug, Clone, PartialEq)]
pub enum Launch {
    Home,
    Prompt(PromptArgs),
    Confirmation(ConfirmationArgs),
    OrderSelection,
    CreateOrder(CreateOrderArgs),
    CreateTask,
    Tasks,
    TaskView { task_id: i64 },
    ManualTasks,
    CreateManualTask,
    ManualTaskView { task_id: i64 },
    CreateRule,
    Rules,
    OutgoingInvitations,
    IncomingInvitations { can_accept: bool },
}

impl Launch {
    pub fn flow_id(&self) -> FlowId {
        match self {
            Self::Home => FlowId::Home,
            Self::Prompt(_) => FlowId::Prompt,
            Self::Confirmation(_) => FlowId::Confirmation,
            Self::OrderSelection => FlowId::OrderSelection,
            Self::CreateOrder(_) => FlowId::CreateOrder,
            Self::CreateTask => FlowId::CreateTask,
            Self::Tasks => FlowId::Tasks,
            Self::TaskView { .. } => FlowId::TaskView,
            Self::ManualTasks => FlowId::ManualTasks,
            Self::CreateManualTask => FlowId::CreateManualTask,
            Self::ManualTaskView { .. } => FlowId::ManualTaskView,
            Self::CreateRule => FlowId::CreateRule,
            Self::Rules => FlowId::Rules,
            Self::OutgoingInvitations => FlowId::OutgoingInvitations,
            Self::IncomingInvitations { .. } => FlowId::IncomingInvitations,
        }
    }

    /// Build a fresh frame for this flow
    pub fn instantiate(self, id: FrameId) -> AnyFrame {
        match self {
            Self::Home => AnyFrame::Home(Frame::new(id, Home::default())),
            Self::Prompt(args) => AnyFrame::Prompt(Frame::new(id, Prompt::new(args))),
            Self::Confirmation(args) => {
                AnyFrame::Confirmation(Frame::new(id, Confirmation::new(args)))
            }
            Self::OrderSelection => {
                AnyFrame::OrderSelection(Frame::new(id, OrderSelection::default()))
            }
            Self::CreateOrder(args) => AnyFrame::CreateOrder(Frame::new(id, CreateOrder::new(args))),
            Self::CreateTask => AnyFrame::CreateTask(Frame::new(id, CreateTask::default())),
            Self::Tasks => AnyFrame::Tasks(Frame::new(id, Tasks::default())),
            Self::TaskView { task_id } => AnyFrame::TaskView(Frame::new(id, TaskView::new(task_id))),
            Self::ManualTasks => AnyFrame::ManualTasks(Frame::new(id, ManualTasks::default())),
            Self::CreateManualTask => {
                AnyFrame::CreateManualTask(Frame::new(id, CreateManualTask::default()))
            }
            Self::ManualTaskView { task_id } => {
                AnyFrame::ManualTaskView(Frame::new(id, ManualTaskView::new(task_id)))
            }
            Self::CreateRule => AnyFrame::CreateRule(Frame::new(id, CreateRule::default())),
            Self::Rules => AnyFrame::Rules(Frame::new(id, Rules::default())),
            Self::OutgoingInvitations => {
                AnyFrame::OutgoingInvitations(Frame::new(id, OutgoingInvitations::default()))
            }
            Self::IncomingInvitations { can_accept } => AnyFrame::IncomingInvitations(Frame::new(
                id,
                IncomingInvitations::new(can_accept),
            )),
        }
    }
}

/// A frame of any registered flow; this is what the stack stores and persists
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnyFrame {
    Home(Frame<Home>),
    Prompt(Frame<Prompt>),
    Confirmation(Frame<Confirmation>),
    OrderSelection(Frame<OrderSelection>),
    CreateOrder(Frame<CreateOrder>),
    CreateTask(Frame<CreateTask>),
    Tasks(Frame<Tasks>),
    TaskView(Frame<TaskView>),
    ManualTasks(Frame<ManualTasks>),
    CreateManualTask(Frame<CreateManualTask>),
    ManualTaskView(Frame<ManualTaskView>),
    CreateRule(Frame<CreateRule>),
    Rules(Frame<Rules>),
    OutgoingInvitations(Frame<OutgoingInvitations>),
    IncomingInvitations(Frame<IncomingInvitations>),
}

macro_rules! each_frame {
    ($value:expr, $frame:ident => $body:expr) => {
        match $value {
            AnyFrame::Home($frame) => $body,
            AnyFrame::Prompt($frame) => $body,
            AnyFrame::Confirmation($frame) => $body,
            AnyFrame::OrderSelection($frame) => $body,
            AnyFrame::CreateOrder($frame) => $body,
            AnyFrame::CreateTask($frame) => $body,
            AnyFrame::Tasks($frame) => $body,
            AnyFrame::TaskView($frame) => $body,
            AnyFrame::ManualTasks($frame) => $body,
            AnyFrame::CreateManualTask($frame) => $body,
            AnyFrame::ManualTaskView($frame) => $body,
            AnyFrame::CreateRule($frame) => $body,
            AnyFrame::Rules($frame) => $body,
            AnyFrame::OutgoingInvitations($frame) => $body,
            AnyFrame::IncomingInvitations($frame) => $body,
        }
    };
}

impl AnyFrame {
    pub fn ops(&self) -> &dyn FrameOps {
        each_frame!(self, frame => frame as &dyn FrameOps)
    }

    pub fn ops_mut(&mut self) -> &mut dyn FrameOps {
        each_frame!(self, frame => frame as &mut dyn FrameOps)
    }
}

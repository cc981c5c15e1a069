//! Requests, responses and domain records exchanged with the room backend

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single call a flow can make against the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BackendRequest {
    GetRoomInfo,
    GetDailyInfo,
    CreateRoom { name: String },
    LeaveRoom,
    ListOrders,
    CreateOrder { users: Vec<i64> },
    DeleteOrder { id: i64 },
    ListTasks,
    GetTaskInfo { id: i64 },
    CreateTask { task: NewTask },
    ModifyTask { patch: TaskPatch },
    RemoveTaskParameters { id: i64, description: bool, order_id: bool },
    DeleteTask { id: i64 },
    ListManualTasks,
    GetManualTaskInfo { id: i64 },
    CurrentExecutor { task_id: i64 },
    CreateManualTask { task: NewManualTask },
    ModifyManualTask { patch: ManualTaskPatch },
    RemoveManualTaskParameters { id: i64, description: bool, order_id: bool },
    DeleteManualTask { id: i64 },
    DoManualTask { id: i64 },
    ListRules,
    CreateRule { rule: NewRule },
    DeleteRule { id: i64 },
    SentInvitations,
    IncomingInvitations,
    Invite { alias: String },
    DeleteInvitation { id: i64 },
    AcceptInvitation { id: i64 },
    RejectInvitation { id: i64 },
}

impl BackendRequest {
    /// Requests that never change backend state and are safe to repeat
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::GetRoomInfo
                | Self::GetDailyInfo
                | Self::ListOrders
                | Self::ListTasks
                | Self::GetTaskInfo { .. }
                | Self::ListManualTasks
                | Self::GetManualTaskInfo { .. }
                | Self::CurrentExecutor { .. }
                | Self::ListRules
                | Self::SentInvitations
                | Self::IncomingInvitations
        )
    }

    /// Short operation name for logging
    pub fn op(&self) -> &'static str {
        match self {
            Self::GetRoomInfo => "get_room_info",
            Self::GetDailyInfo => "get_daily_info",
            Self::CreateRoom { .. } => "create_room",
            Self::LeaveRoom => "leave_room",
            Self::ListOrders => "list_orders",
            Self::CreateOrder { .. } => "create_order",
            Self::DeleteOrder { .. } => "delete_order",
            Self::ListTasks => "list_tasks",
            Self::GetTaskInfo { .. } => "get_task_info",
            Self::CreateTask { .. } => "create_task",
            Self::ModifyTask { .. } => "modify_task",
            Self::RemoveTaskParameters { .. } => "remove_task_parameters",
            Self::DeleteTask { .. } => "delete_task",
            Self::ListManualTasks => "list_manual_tasks",
            Self::GetManualTaskInfo { .. } => "get_manual_task_info",
            Self::CurrentExecutor { .. } => "current_executor",
            Self::CreateManualTask { .. } => "create_manual_task",
            Self::ModifyManualTask { .. } => "modify_manual_task",
            Self::RemoveManualTaskParameters { .. } => "remove_manual_task_parameters",
            Self::DeleteManualTask { .. } => "delete_manual_task",
            Self::DoManualTask { .. } => "do_manual_task",
            Self::ListRules => "list_rules",
            Self::CreateRule { .. } => "create_rule",
            Self::DeleteRule { .. } => "delete_rule",
            Self::SentInvitations => "sent_invitations",
            Self::IncomingInvitations => "incoming_invitations",
            Self::Invite { .. } => "invite",
            Self::DeleteInvitation { .. } => "delete_invitation",
            Self::AcceptInvitation { .. } => "accept_invitation",
            Self::RejectInvitation { .. } => "reject_invitation",
        }
    }
}

/// Decoded backend answer
#[derive(Debug, Clone, PartialEq)]
pub enum BackendResponse {
    Room(RoomInfo),
    Daily(DailyInfo),
    Orders(OrderList),
    /// Periodic or manual task list, depending on the request
    Tasks(Vec<TaskSummary>),
    Task(TaskInfo),
    ManualTask(ManualTaskInfo),
    Executor(CurrentExecutor),
    Rules(Vec<RuleInfo>),
    Sent(Vec<SentInvitation>),
    Incoming(Vec<IncomingInvitation>),
    /// Id of a newly created entity (room, order, task, rule, invitation)
    Created(i64),
    /// Acknowledgement of a modification or deletion
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub alias: Option<String>,
    pub fullname: Option<String>,
}

impl UserInfo {
    pub fn is_empty(&self) -> bool {
        self.alias.is_none() && self.fullname.is_none()
    }

    /// "Full Name (@alias)", falling back to the alias or the numeric id
    pub fn display_name(&self) -> String {
        match (&self.fullname, &self.alias) {
            (Some(name), Some(alias)) => format!("{name} (@{alias})"),
            (Some(name), None) => name.clone(),
            (None, Some(alias)) => format!("@{alias}"),
            (None, None) => format!("user {}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: i64,
    pub name: String,
    pub users: Vec<UserInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTask {
    pub id: i64,
    pub name: String,
    pub today_user_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyInfo {
    pub tasks: Vec<DailyTask>,
}

/// Orders of the room keyed by id, plus the users they mention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderList {
    pub orders: BTreeMap<i64, Vec<i64>>,
    pub users: Vec<UserInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: i64,
    pub name: String,
    pub inactive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDateTime,
    pub period: u32,
    pub order_id: Option<i64>,
    pub inactive: bool,
}

/// Payload of a finished task wizard and body of a create call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub start_date: NaiveDateTime,
    /// Period in days
    pub period: u32,
    pub order_id: Option<i64>,
}

/// Partial task update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
}

impl TaskPatch {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualTaskInfo {
    pub name: String,
    pub description: Option<String>,
    pub order_id: Option<i64>,
}

/// Whose turn a manual task is: a position in its order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentExecutor {
    pub number: usize,
    pub id: i64,
}

/// Payload of a finished manual task wizard and body of a create call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewManualTask {
    pub name: String,
    pub description: Option<String>,
    pub order_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualTaskPatch {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
}

impl ManualTaskPatch {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleInfo {
    pub id: i64,
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentInvitation {
    pub id: i64,
    pub addressee: String,
    pub room: i64,
    pub room_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingInvitation {
    pub id: i64,
    pub sender: UserInfo,
    pub room: i64,
    pub room_name: String,
}

//! HTTP client for the room backend API

use super::{
    Backend, BackendError, BackendRequest, BackendResponse, CurrentExecutor, DailyInfo,
    IncomingInvitation, ManualTaskInfo, OrderList, RoomInfo, RuleInfo, SentInvitation, TaskInfo,
    TaskSummary,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// Backend reached over HTTP; every call is a JSON POST authenticated by a shared secret
pub struct HttpBackend {
    client: Client,
    base_url: String,
    secret: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, secret: String) -> Result<Self, BackendError> {
        let client = Client::builder()
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret,
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn call(
        &self,
        user_id: i64,
        request: &BackendRequest,
    ) -> Result<BackendResponse, BackendError> {
        let (path, body) = route(user_id, request);
        let url = format!("{}{path}", self.base_url);

        tracing::debug!(op = request.op(), %url, "Calling backend");

        let response = self
            .client
            .post(&url)
            .header("X-Token", &self.secret)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Transport(format!("Request timeout: {e}"))
                } else {
                    BackendError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(format!("Failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &text));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| BackendError::Decode(format!("{e}: {text}")))?;
        decode(request, value)
    }
}

/// Endpoint path and JSON body for a request
fn route(user_id: i64, request: &BackendRequest) -> (&'static str, Value) {
    match request {
        BackendRequest::GetRoomInfo => ("/bot/room/info", json!({ "user_id": user_id })),
        BackendRequest::GetDailyInfo => ("/bot/room/daily_info", json!({ "user_id": user_id })),
        BackendRequest::CreateRoom { name } => (
            "/bot/room/create",
            json!({ "user_id": user_id, "room": { "name": name } }),
        ),
        BackendRequest::LeaveRoom => ("/bot/room/leave", json!({ "user_id": user_id })),
        BackendRequest::ListOrders => ("/bot/room/list_of_orders", json!({ "user_id": user_id })),
        BackendRequest::CreateOrder { users } => (
            "/bot/order/create",
            json!({ "user_id": user_id, "order": { "users": users } }),
        ),
        BackendRequest::DeleteOrder { id } => (
            "/bot/order/delete",
            json!({ "user_id": user_id, "order_id": id }),
        ),
        BackendRequest::ListTasks => ("/bot/task/list", json!({ "user_id": user_id })),
        BackendRequest::GetTaskInfo { id } => (
            "/bot/task/info",
            json!({ "user_id": user_id, "task": { "id": id } }),
        ),
        BackendRequest::CreateTask { task } => (
            "/bot/task/create",
            json!({ "user_id": user_id, "task": task }),
        ),
        BackendRequest::ModifyTask { patch } => (
            "/bot/task/modify",
            json!({ "user_id": user_id, "task": patch }),
        ),
        BackendRequest::RemoveTaskParameters {
            id,
            description,
            order_id,
        } => (
            "/bot/task/remove_parameters",
            json!({
                "user_id": user_id,
                "task": { "id": id, "description": description, "order_id": order_id },
            }),
        ),
        BackendRequest::DeleteTask { id } => (
            "/bot/task/delete",
            json!({ "user_id": user_id, "task_id": id }),
        ),
        BackendRequest::ListManualTasks => {
            ("/bot/manual_task/list", json!({ "user_id": user_id }))
        }
        BackendRequest::GetManualTaskInfo { id } => (
            "/bot/manual_task/info",
            json!({ "user_id": user_id, "task_id": id }),
        ),
        BackendRequest::CurrentExecutor { task_id } => (
            "/bot/manual_task/current_executor",
            json!({ "user_id": user_id, "task_id": task_id }),
        ),
        BackendRequest::CreateManualTask { task } => (
            "/bot/manual_task/create",
            json!({ "user_id": user_id, "task": task }),
        ),
        BackendRequest::ModifyManualTask { patch } => (
            "/bot/manual_task/modify",
            json!({ "user_id": user_id, "task": patch }),
        ),
        BackendRequest::RemoveManualTaskParameters {
            id,
            description,
            order_id,
        } => (
            "/bot/manual_task/remove_parameters",
            json!({
                "user_id": user_id,
                "task": { "id": id, "description": description, "order_id": order_id },
            }),
        ),
        BackendRequest::DeleteManualTask { id } => (
            "/bot/manual_task/delete",
            json!({ "user_id": user_id, "task_id": id }),
        ),
        BackendRequest::DoManualTask { id } => (
            "/bot/manual_task/do",
            json!({ "user_id": user_id, "task_id": id }),
        ),
        BackendRequest::ListRules => ("/bot/rule/list", json!({ "user_id": user_id })),
        BackendRequest::CreateRule { rule } => (
            "/bot/rule/create",
            json!({ "user_id": user_id, "rule": rule }),
        ),
        BackendRequest::DeleteRule { id } => (
            "/bot/rule/delete",
            json!({ "user_id": user_id, "rule_id": id }),
        ),
        BackendRequest::SentInvitations => ("/bot/invitation/sent", json!({ "user_id": user_id })),
        BackendRequest::IncomingInvitations => {
            ("/bot/invitation/inbox", json!({ "user_id": user_id }))
        }
        BackendRequest::Invite { alias } => (
            "/bot/invitation/create",
            json!({ "user_id": user_id, "addressee": { "alias": alias } }),
        ),
        BackendRequest::DeleteInvitation { id } => (
            "/bot/invitation/delete",
            json!({ "user_id": user_id, "invitation": { "id": id } }),
        ),
        BackendRequest::AcceptInvitation { id } => (
            "/bot/invitation/accept",
            json!({ "user_id": user_id, "invitation": { "id": id } }),
        ),
        BackendRequest::RejectInvitation { id } => (
            "/bot/invitation/reject",
            json!({ "user_id": user_id, "invitation": { "id": id } }),
        ),
    }
}

#[derive(Deserialize)]
struct TaskListBody {
    tasks: Vec<TaskSummary>,
}

#[derive(Deserialize)]
struct InvitationsBody<T> {
    invitations: Vec<T>,
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Decode the JSON answer according to what was asked
fn decode(request: &BackendRequest, value: Value) -> Result<BackendResponse, BackendError> {
    let response = match request {
        BackendRequest::GetRoomInfo => BackendResponse::Room(parse::<RoomInfo>(value)?),
        BackendRequest::GetDailyInfo => BackendResponse::Daily(parse::<DailyInfo>(value)?),
        BackendRequest::ListOrders => BackendResponse::Orders(parse::<OrderList>(value)?),
        BackendRequest::ListTasks | BackendRequest::ListManualTasks => {
            BackendResponse::Tasks(parse::<TaskListBody>(value)?.tasks)
        }
        BackendRequest::GetManualTaskInfo { .. } => {
            BackendResponse::ManualTask(parse::<ManualTaskInfo>(value)?)
        }
        BackendRequest::CurrentExecutor { .. } => {
            BackendResponse::Executor(parse::<CurrentExecutor>(value)?)
        }
        BackendRequest::GetTaskInfo { .. } => BackendResponse::Task(parse::<TaskInfo>(value)?),
        BackendRequest::ListRules => BackendResponse::Rules(parse::<Vec<RuleInfo>>(value)?),
        BackendRequest::SentInvitations => BackendResponse::Sent(
            parse::<InvitationsBody<SentInvitation>>(value)?.invitations,
        ),
        BackendRequest::IncomingInvitations => BackendResponse::Incoming(
            parse::<InvitationsBody<IncomingInvitation>>(value)?.invitations,
        ),
        BackendRequest::CreateRoom { .. }
        | BackendRequest::CreateOrder { .. }
        | BackendRequest::CreateTask { .. }
        | BackendRequest::CreateManualTask { .. }
        | BackendRequest::CreateRule { .. }
        | BackendRequest::Invite { .. }
        | BackendRequest::AcceptInvitation { .. } => {
            BackendResponse::Created(parse::<i64>(value)?)
        }
        BackendRequest::LeaveRoom
        | BackendRequest::DeleteOrder { .. }
        | BackendRequest::ModifyTask { .. }
        | BackendRequest::RemoveTaskParameters { .. }
        | BackendRequest::DeleteTask { .. }
        | BackendRequest::ModifyManualTask { .. }
        | BackendRequest::RemoveManualTaskParameters { .. }
        | BackendRequest::DeleteManualTask { .. }
        | BackendRequest::DoManualTask { .. }
        | BackendRequest::DeleteRule { .. }
        | BackendRequest::DeleteInvitation { .. }
        | BackendRequest::RejectInvitation { .. } => BackendResponse::Done,
    };
    Ok(response)
}

/// Map a non-success status and body onto the error taxonomy
fn classify_error(status: u16, body: &str) -> BackendError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let detail = parsed.as_ref().and_then(|v| v.get("detail")).map(|d| match d {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });

    match (status, detail) {
        (400, Some(detail)) => {
            let code = parsed
                .as_ref()
                .and_then(|v| v.get("code"))
                .and_then(Value::as_i64);
            BackendError::Domain { code, detail }
        }
        (422, Some(detail)) => BackendError::Domain { code: None, detail },
        _ => BackendError::Status {
            status,
            body: body.to_string(),
        },
    }
}

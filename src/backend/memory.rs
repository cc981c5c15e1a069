//! In-process backend keeping the whole room domain in memory
//!
//! Used when no backend URL is configured and by the dialog tests. Every
//! state-changing request is recorded so callers can assert on writes.

use super::{
    Backend, BackendError, BackendRequest, BackendResponse, CurrentExecutor, DailyInfo, DailyTask,
    IncomingInvitation, ManualTaskInfo, NewTask, OrderList, RoomInfo, RuleInfo, SentInvitation,
    TaskInfo, TaskSummary, UserInfo, NO_ROOM,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

// Domain error codes, numbered like the HTTP backend's
const ALREADY_IN_ROOM: i64 = 2;
const NOT_FOUND: i64 = 3;
const UNKNOWN_ALIAS: i64 = 4;
const EMPTY_ORDER: i64 = 5;
const NO_ORDER: i64 = 6;

struct StoredTask {
    room: i64,
    name: String,
    description: Option<String>,
    start_date: chrono::NaiveDateTime,
    period: u32,
    order_id: Option<i64>,
}

struct StoredManualTask {
    room: i64,
    name: String,
    description: Option<String>,
    order_id: Option<i64>,
    /// Times the task was done; the next executor is `done % order.len()`
    done: usize,
}

struct StoredInvitation {
    sender: i64,
    addressee: String,
    room: i64,
}

#[derive(Default)]
struct World {
    users: BTreeMap<i64, UserInfo>,
    rooms: BTreeMap<i64, String>,
    membership: BTreeMap<i64, i64>,
    orders: BTreeMap<i64, (i64, Vec<i64>)>,
    tasks: BTreeMap<i64, StoredTask>,
    manual_tasks: BTreeMap<i64, StoredManualTask>,
    rules: BTreeMap<i64, (i64, RuleInfo)>,
    invitations: BTreeMap<i64, StoredInvitation>,
    next_id: i64,
    writes: Vec<BackendRequest>,
}

impl World {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn room_of(&self, user_id: i64) -> Result<i64, BackendError> {
        self.membership
            .get(&user_id)
            .copied()
            .ok_or_else(|| BackendError::domain(NO_ROOM, "User doesn't have a room"))
    }

    fn user(&self, user_id: i64) -> UserInfo {
        self.users.get(&user_id).cloned().unwrap_or(UserInfo {
            id: user_id,
            alias: None,
            fullname: None,
        })
    }

    fn members(&self, room: i64) -> Vec<UserInfo> {
        self.membership
            .iter()
            .filter(|(_, r)| **r == room)
            .map(|(user, _)| self.user(*user))
            .collect()
    }

    fn task_in_room(&mut self, id: i64, room: i64) -> Result<&mut StoredTask, BackendError> {
        self.tasks
            .get_mut(&id)
            .filter(|t| t.room == room)
            .ok_or_else(|| BackendError::domain(NOT_FOUND, "Task not found"))
    }

    fn manual_task(&self, id: i64, room: i64) -> Result<&StoredManualTask, BackendError> {
        self.manual_tasks
            .get(&id)
            .filter(|t| t.room == room)
            .ok_or_else(|| BackendError::domain(NOT_FOUND, "Task not found"))
    }

    fn manual_task_in_room(
        &mut self,
        id: i64,
        room: i64,
    ) -> Result<&mut StoredManualTask, BackendError> {
        self.manual_tasks
            .get_mut(&id)
            .filter(|t| t.room == room)
            .ok_or_else(|| BackendError::domain(NOT_FOUND, "Task not found"))
    }

    /// Position and user whose turn it is for a manual task
    fn executor(&self, task: &StoredManualTask) -> Result<CurrentExecutor, BackendError> {
        let order = task
            .order_id
            .and_then(|id| self.orders.get(&id))
            .map(|(_, users)| users)
            .filter(|users| !users.is_empty())
            .ok_or_else(|| BackendError::domain(NO_ORDER, "Task doesn't have an order"))?;
        let number = task.done % order.len();
        Ok(CurrentExecutor {
            number,
            id: order[number],
        })
    }

    fn alias_of(&self, user_id: i64) -> Option<&str> {
        self.users.get(&user_id).and_then(|u| u.alias.as_deref())
    }

    fn insert_task(&mut self, room: i64, task: &NewTask) -> i64 {
        let id = self.allocate();
        self.tasks.insert(
            id,
            StoredTask {
                room,
                name: task.name.clone(),
                description: task.description.clone(),
                start_date: task.start_date,
                period: task.period,
                order_id: task.order_id,
            },
        );
        id
    }

    /// Whose turn it is today for a task, counting whole periods since its start
    fn today_user(&self, task: &StoredTask, today: chrono::NaiveDate) -> Option<i64> {
        let order = &self.orders.get(&task.order_id?)?.1;
        if order.is_empty() || task.period == 0 {
            return None;
        }
        let days = (today - task.start_date.date()).num_days();
        if days < 0 {
            return None;
        }
        let turns = days / i64::from(task.period);
        let len = i64::try_from(order.len()).ok()?;
        let index = usize::try_from(turns.rem_euclid(len)).ok()?;
        order.get(index).copied()
    }

    #[allow(clippy::too_many_lines)] // One arm per request kind
    fn handle(
        &mut self,
        user_id: i64,
        request: &BackendRequest,
    ) -> Result<BackendResponse, BackendError> {
        if !request.is_read_only() {
            self.writes.push(request.clone());
        }

        match request {
            BackendRequest::GetRoomInfo => {
                let room = self.room_of(user_id)?;
                Ok(BackendResponse::Room(RoomInfo {
                    id: room,
                    name: self.rooms.get(&room).cloned().unwrap_or_default(),
                    users: self.members(room),
                }))
            }
            BackendRequest::GetDailyInfo => {
                let room = self.room_of(user_id)?;
                let today = chrono::Local::now().date_naive();
                let tasks = self
                    .tasks
                    .iter()
                    .filter(|(_, t)| t.room == room)
                    .map(|(id, t)| DailyTask {
                        id: *id,
                        name: t.name.clone(),
                        today_user_id: self.today_user(t, today),
                    })
                    .collect();
                Ok(BackendResponse::Daily(DailyInfo { tasks }))
            }
            BackendRequest::CreateRoom { name } => {
                if self.membership.contains_key(&user_id) {
                    return Err(BackendError::domain(
                        ALREADY_IN_ROOM,
                        "User already has a room",
                    ));
                }
                let room = self.allocate();
                self.rooms.insert(room, name.clone());
                self.membership.insert(user_id, room);
                Ok(BackendResponse::Created(room))
            }
            BackendRequest::LeaveRoom => {
                self.room_of(user_id)?;
                self.membership.remove(&user_id);
                Ok(BackendResponse::Done)
            }
            BackendRequest::ListOrders => {
                let room = self.room_of(user_id)?;
                let orders = self
                    .orders
                    .iter()
                    .filter(|(_, (r, _))| *r == room)
                    .map(|(id, (_, users))| (*id, users.clone()))
                    .collect();
                Ok(BackendResponse::Orders(OrderList {
                    orders,
                    users: self.members(room),
                }))
            }
            BackendRequest::CreateOrder { users } => {
                let room = self.room_of(user_id)?;
                if users.is_empty() {
                    return Err(BackendError::domain(EMPTY_ORDER, "Order can't be empty"));
                }
                let id = self.allocate();
                self.orders.insert(id, (room, users.clone()));
                Ok(BackendResponse::Created(id))
            }
            BackendRequest::DeleteOrder { id } => {
                let room = self.room_of(user_id)?;
                match self.orders.get(id) {
                    Some((r, _)) if *r == room => {
                        self.orders.remove(id);
                        Ok(BackendResponse::Done)
                    }
                    _ => Err(BackendError::domain(NOT_FOUND, "Order not found")),
                }
            }
            BackendRequest::ListTasks => {
                let room = self.room_of(user_id)?;
                let tasks = self
                    .tasks
                    .iter()
                    .filter(|(_, t)| t.room == room)
                    .map(|(id, t)| TaskSummary {
                        id: *id,
                        name: t.name.clone(),
                        inactive: t.order_id.is_none(),
                    })
                    .collect();
                Ok(BackendResponse::Tasks(tasks))
            }
            BackendRequest::GetTaskInfo { id } => {
                let room = self.room_of(user_id)?;
                let task = self.task_in_room(*id, room)?;
                Ok(BackendResponse::Task(TaskInfo {
                    name: task.name.clone(),
                    description: task.description.clone(),
                    start_date: task.start_date,
                    period: task.period,
                    order_id: task.order_id,
                    inactive: task.order_id.is_none(),
                }))
            }
            BackendRequest::CreateTask { task } => {
                let room = self.room_of(user_id)?;
                Ok(BackendResponse::Created(self.insert_task(room, task)))
            }
            BackendRequest::ModifyTask { patch } => {
                let room = self.room_of(user_id)?;
                let task = self.task_in_room(patch.id, room)?;
                if let Some(name) = &patch.name {
                    task.name.clone_from(name);
                }
                if let Some(description) = &patch.description {
                    task.description = Some(description.clone());
                }
                if let Some(start_date) = patch.start_date {
                    task.start_date = start_date;
                }
                if let Some(period) = patch.period {
                    task.period = period;
                }
                if let Some(order_id) = patch.order_id {
                    task.order_id = Some(order_id);
                }
                Ok(BackendResponse::Done)
            }
            BackendRequest::RemoveTaskParameters {
                id,
                description,
                order_id,
            } => {
                let room = self.room_of(user_id)?;
                let task = self.task_in_room(*id, room)?;
                if *description {
                    task.description = None;
                }
                if *order_id {
                    task.order_id = None;
                }
                Ok(BackendResponse::Done)
            }
            BackendRequest::DeleteTask { id } => {
                let room = self.room_of(user_id)?;
                self.task_in_room(*id, room)?;
                self.tasks.remove(id);
                Ok(BackendResponse::Done)
            }
            BackendRequest::ListManualTasks => {
                let room = self.room_of(user_id)?;
                let tasks = self
                    .manual_tasks
                    .iter()
                    .filter(|(_, t)| t.room == room)
                    .map(|(id, t)| TaskSummary {
                        id: *id,
                        name: t.name.clone(),
                        inactive: t.order_id.is_none(),
                    })
                    .collect();
                Ok(BackendResponse::Tasks(tasks))
            }
            BackendRequest::GetManualTaskInfo { id } => {
                let room = self.room_of(user_id)?;
                let task = self.manual_task(*id, room)?;
                Ok(BackendResponse::ManualTask(ManualTaskInfo {
                    name: task.name.clone(),
                    description: task.description.clone(),
                    order_id: task.order_id,
                }))
            }
            BackendRequest::CurrentExecutor { task_id } => {
                let room = self.room_of(user_id)?;
                let task = self.manual_task(*task_id, room)?;
                Ok(BackendResponse::Executor(self.executor(task)?))
            }
            BackendRequest::CreateManualTask { task } => {
                let room = self.room_of(user_id)?;
                let id = self.allocate();
                self.manual_tasks.insert(
                    id,
                    StoredManualTask {
                        room,
                        name: task.name.clone(),
                        description: task.description.clone(),
                        order_id: task.order_id,
                        done: 0,
                    },
                );
                Ok(BackendResponse::Created(id))
            }
            BackendRequest::ModifyManualTask { patch } => {
                let room = self.room_of(user_id)?;
                let task = self.manual_task_in_room(patch.id, room)?;
                if let Some(name) = &patch.name {
                    task.name.clone_from(name);
                }
                if let Some(description) = &patch.description {
                    task.description = Some(description.clone());
                }
                if let Some(order_id) = patch.order_id {
                    task.order_id = Some(order_id);
                    task.done = 0;
                }
                Ok(BackendResponse::Done)
            }
            BackendRequest::RemoveManualTaskParameters {
                id,
                description,
                order_id,
            } => {
                let room = self.room_of(user_id)?;
                let task = self.manual_task_in_room(*id, room)?;
                if *description {
                    task.description = None;
                }
                if *order_id {
                    task.order_id = None;
                    task.done = 0;
                }
                Ok(BackendResponse::Done)
            }
            BackendRequest::DeleteManualTask { id } => {
                let room = self.room_of(user_id)?;
                self.manual_task(*id, room)?;
                self.manual_tasks.remove(id);
                Ok(BackendResponse::Done)
            }
            BackendRequest::DoManualTask { id } => {
                let room = self.room_of(user_id)?;
                self.executor(self.manual_task(*id, room)?)?;
                self.manual_task_in_room(*id, room)?.done += 1;
                Ok(BackendResponse::Done)
            }
            BackendRequest::ListRules => {
                let room = self.room_of(user_id)?;
                let rules = self
                    .rules
                    .values()
                    .filter(|(r, _)| *r == room)
                    .map(|(_, rule)| rule.clone())
                    .collect();
                Ok(BackendResponse::Rules(rules))
            }
            BackendRequest::CreateRule { rule } => {
                let room = self.room_of(user_id)?;
                let id = self.allocate();
                self.rules.insert(
                    id,
                    (
                        room,
                        RuleInfo {
                            id,
                            name: rule.name.clone(),
                            text: rule.text.clone(),
                        },
                    ),
                );
                Ok(BackendResponse::Created(id))
            }
            BackendRequest::DeleteRule { id } => {
                let room = self.room_of(user_id)?;
                match self.rules.get(id) {
                    Some((r, _)) if *r == room => {
                        self.rules.remove(id);
                        Ok(BackendResponse::Done)
                    }
                    _ => Err(BackendError::domain(NOT_FOUND, "Rule not found")),
                }
            }
            BackendRequest::SentInvitations => {
                let invitations = self
                    .invitations
                    .iter()
                    .filter(|(_, inv)| inv.sender == user_id)
                    .map(|(id, inv)| SentInvitation {
                        id: *id,
                        addressee: inv.addressee.clone(),
                        room: inv.room,
                        room_name: self.rooms.get(&inv.room).cloned().unwrap_or_default(),
                    })
                    .collect();
                Ok(BackendResponse::Sent(invitations))
            }
            BackendRequest::IncomingInvitations => {
                let Some(alias) = self.alias_of(user_id).map(str::to_string) else {
                    return Ok(BackendResponse::Incoming(Vec::new()));
                };
                let invitations = self
                    .invitations
                    .iter()
                    .filter(|(_, inv)| inv.addressee == alias)
                    .map(|(id, inv)| IncomingInvitation {
                        id: *id,
                        sender: self.user(inv.sender),
                        room: inv.room,
                        room_name: self.rooms.get(&inv.room).cloned().unwrap_or_default(),
                    })
                    .collect();
                Ok(BackendResponse::Incoming(invitations))
            }
            BackendRequest::Invite { alias } => {
                let room = self.room_of(user_id)?;
                if !self
                    .users
                    .values()
                    .any(|u| u.alias.as_deref() == Some(alias.as_str()))
                {
                    return Err(BackendError::domain(UNKNOWN_ALIAS, "Unknown user alias"));
                }
                let id = self.allocate();
                self.invitations.insert(
                    id,
                    StoredInvitation {
                        sender: user_id,
                        addressee: alias.clone(),
                        room,
                    },
                );
                Ok(BackendResponse::Created(id))
            }
            BackendRequest::DeleteInvitation { id } => {
                match self.invitations.get(id) {
                    Some(inv) if inv.sender == user_id => {
                        self.invitations.remove(id);
                        Ok(BackendResponse::Done)
                    }
                    _ => Err(BackendError::domain(NOT_FOUND, "Invitation not found")),
                }
            }
            BackendRequest::AcceptInvitation { id } | BackendRequest::RejectInvitation { id } => {
                let alias = self.alias_of(user_id).map(str::to_string);
                let Some(inv) = self
                    .invitations
                    .get(id)
                    .filter(|inv| Some(&inv.addressee) == alias.as_ref())
                else {
                    return Err(BackendError::domain(NOT_FOUND, "Invitation not found"));
                };
                let room = inv.room;
                if matches!(request, BackendRequest::RejectInvitation { .. }) {
                    self.invitations.remove(id);
                    return Ok(BackendResponse::Done);
                }
                if self.membership.contains_key(&user_id) {
                    return Err(BackendError::domain(
                        ALREADY_IN_ROOM,
                        "User already has a room",
                    ));
                }
                self.invitations.remove(id);
                self.membership.insert(user_id, room);
                Ok(BackendResponse::Created(room))
            }
        }
    }
}

/// In-memory backend; one shared world for all users
#[derive(Default)]
pub struct InMemoryBackend {
    world: Mutex<World>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn world(&self) -> MutexGuard<'_, World> {
        // A panic while holding the lock leaves the world consistent per request
        self.world
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register a user profile
    pub fn add_user(&self, id: i64, fullname: &str, alias: Option<&str>) {
        self.world().users.insert(
            id,
            UserInfo {
                id,
                alias: alias.map(str::to_string),
                fullname: Some(fullname.to_string()),
            },
        );
    }

    /// Create a room with the given members, returning its id
    pub fn add_room(&self, name: &str, members: &[i64]) -> i64 {
        let mut world = self.world();
        let room = world.allocate();
        world.rooms.insert(room, name.to_string());
        for member in members {
            world.membership.insert(*member, room);
        }
        room
    }

    /// Create an order in the room of `user_id`
    pub fn add_order(&self, user_id: i64, users: &[i64]) -> Option<i64> {
        let mut world = self.world();
        let room = world.room_of(user_id).ok()?;
        let id = world.allocate();
        world.orders.insert(id, (room, users.to_vec()));
        Some(id)
    }

    /// Create a task in the room of `user_id`
    pub fn add_task(&self, user_id: i64, task: &NewTask) -> Option<i64> {
        let mut world = self.world();
        let room = world.room_of(user_id).ok()?;
        Some(world.insert_task(room, task))
    }

    /// Send an invitation from `sender` to the user with `alias`
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn add_invitation(&self, sender: i64, alias: &str) -> Option<i64> {
        let mut world = self.world();
        let room = world.room_of(sender).ok()?;
        let id = world.allocate();
        world.invitations.insert(
            id,
            StoredInvitation {
                sender,
                addressee: alias.to_string(),
                room,
            },
        );
        Some(id)
    }

    /// Every state-changing request seen so far, in order
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn writes(&self) -> Vec<BackendRequest> {
        self.world().writes.clone()
    }

    /// Handle a request synchronously
    pub fn handle(
        &self,
        user_id: i64,
        request: &BackendRequest,
    ) -> Result<BackendResponse, BackendError> {
        self.world().handle(user_id, request)
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn call(
        &self,
        user_id: i64,
        request: &BackendRequest,
    ) -> Result<BackendResponse, BackendError> {
        self.handle(user_id, request)
    }
}

//! Concrete flows
//!
//! Reusable steps ([`Prompt`], [`Confirmation`], [`OrderSelection`],
//! [`CreateOrder`]) plus the screens built on top of them: periodic and
//! manual tasks, rules, invitations. Each flow keeps
//! the values it collects as typed fields and talks to the engine only
//! through [`Step`](crate::dialog::Step).

mod confirmation;
mod create_manual_task;
mod create_order;
mod create_rule;
mod create_task;
mod home;
mod invitations;
mod manual_task_view;
mod manual_tasks;
mod order_selection;
mod prompt;
mod rules;
mod task_view;
mod tasks;

pub use confirmation::{Confirmation, ConfirmationArgs};
pub use create_manual_task::CreateManualTask;
pub use create_order::{CreateOrder, CreateOrderArgs};
pub use create_rule::CreateRule;
pub use create_task::{CreateTask, TaskDraft};
pub use home::Home;
pub use invitations::{IncomingInvitations, OutgoingInvitations};
pub use manual_task_view::ManualTaskView;
pub use manual_tasks::ManualTasks;
pub use order_selection::OrderSelection;
pub use prompt::{Prompt, PromptArgs, Validator, DATE_FORMAT};
pub use rules::Rules;
pub use task_view::TaskView;
pub use tasks::Tasks;

use crate::backend::UserInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display names of the room's users, by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    names: BTreeMap<i64, String>,
}

impl Roster {
    /// Users with neither a name nor an alias are left out
    pub fn from_users(users: &[UserInfo]) -> Self {
        Self {
            names: users
                .iter()
                .filter(|u| !u.is_empty())
                .map(|u| (u.id, u.display_name()))
                .collect(),
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.names.contains_key(&id)
    }

    pub fn name(&self, id: i64) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("user {id}"))
    }

    /// "Anna - Boris - Anna"
    pub fn chain(&self, ids: &[i64]) -> String {
        ids.iter()
            .map(|id| self.name(*id))
            .collect::<Vec<_>>()
            .join(" - ")
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

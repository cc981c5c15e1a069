//! Room task list: create, open, refresh

use crate::backend::{BackendError, BackendRequest, BackendResponse, TaskSummary};
use crate::dialog::{
    Button, Flow, FlowCx, FlowId, FlowResult, Input, Intent, Launch, Payload, PayloadKind, Step,
    View,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TasksIntent {
    NewTask,
    ViewTask,
}

impl Intent for TasksIntent {
    fn expects(&self) -> PayloadKind {
        match self {
            Self::NewTask => PayloadKind::Task,
            Self::ViewTask => PayloadKind::Nothing,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tasks {
    tasks: Vec<TaskSummary>,
}

impl Flow for Tasks {
    type Intent = TasksIntent;

    const ID: FlowId = FlowId::Tasks;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<Self::Intent> {
        Step::Call(BackendRequest::ListTasks)
    }

    fn on_input(&mut self, _cx: &mut FlowCx, input: Input) -> Step<Self::Intent> {
        match input {
            Input::Press(Button::CreateNew) => Step::push(Launch::CreateTask, TasksIntent::NewTask),
            Input::Pick(id) if self.tasks.iter().any(|t| t.id == id) => {
                Step::push(Launch::TaskView { task_id: id }, TasksIntent::ViewTask)
            }
            Input::Press(Button::Refresh) => Step::Call(BackendRequest::ListTasks),
            Input::Press(Button::Back | Button::Cancel) => Step::done(Payload::Empty),
            _ => Step::Stay,
        }
    }

    fn on_result(
        &mut self,
        _cx: &mut FlowCx,
        intent: Self::Intent,
        result: FlowResult,
    ) -> Step<Self::Intent> {
        match (intent, result) {
            (
                TasksIntent::NewTask,
                FlowResult {
                    success: true,
                    payload: Payload::Task(task),
                },
            ) => Step::Call(BackendRequest::CreateTask { task }),
            // Cancelled wizard: nothing was created, just show the list again
            (TasksIntent::NewTask, _) => Step::Stay,
            // The task may have been edited or deleted
            (TasksIntent::ViewTask, _) => Step::Call(BackendRequest::ListTasks),
        }
    }

    fn on_reply(
        &mut self,
        cx: &mut FlowCx,
        request: BackendRequest,
        outcome: Result<BackendResponse, BackendError>,
    ) -> Step<Self::Intent> {
        match (request, outcome) {
            (_, Ok(BackendResponse::Tasks(tasks))) => {
                self.tasks = tasks;
                Step::Stay
            }
            (BackendRequest::CreateTask { .. }, Ok(_)) => {
                cx.notify("The task has been created");
                Step::Call(BackendRequest::ListTasks)
            }
            (_, Err(e)) => {
                cx.notify(e.user_message());
                Step::Stay
            }
            (request, Ok(response)) => {
                tracing::warn!(op = request.op(), ?response, "Unexpected reply in task list");
                Step::Stay
            }
        }
    }

    fn view(&self) -> View {
        let mut view = View::new(if self.tasks.is_empty() {
            "There are no tasks yet"
        } else {
            "Tasks:"
        });
        for task in &self.tasks {
            let label = if task.inactive {
                format!("{} (inactive)", task.name)
            } else {
                task.name.clone()
            };
            view = view.item(label, task.id);
        }
        view.button("Create task", Button::CreateNew)
            .button("Refresh", Button::Refresh)
            .button("Back", Button::Back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn task() -> crate::backend::NewTask {
        crate::backend::NewTask {
            name: "Trash duty".into(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2030, 1, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            period: 7,
            order_id: Some(3),
        }
    }

    #[test]
    fn finished_wizard_is_created_then_list_reloads() {
        let mut flow = Tasks::default();
        let mut cx = FlowCx::default();
        let step = flow.on_result(
            &mut cx,
            TasksIntent::NewTask,
            FlowResult::done(Payload::Task(task())),
        );
        assert_eq!(step, Step::Call(BackendRequest::CreateTask { task: task() }));

        let step = flow.on_reply(
            &mut cx,
            BackendRequest::CreateTask { task: task() },
            Ok(BackendResponse::Created(11)),
        );
        assert_eq!(step, Step::Call(BackendRequest::ListTasks));
    }

    #[test]
    fn cancelled_wizard_creates_nothing() {
        let mut flow = Tasks::default();
        let step = flow.on_result(
            &mut FlowCx::default(),
            TasksIntent::NewTask,
            FlowResult::cancelled(),
        );
        assert_eq!(step, Step::Stay);
    }

    #[test]
    fn only_listed_tasks_can_be_opened() {
        let mut flow = Tasks::default();
        let mut cx = FlowCx::default();
        flow.on_reply(
            &mut cx,
            BackendRequest::ListTasks,
            Ok(BackendResponse::Tasks(vec![TaskSummary {
                id: 4,
                name: "Dishes".into(),
                inactive: false,
            }])),
        );
        assert_eq!(
            flow.on_input(&mut cx, Input::Pick(4)),
            Step::push(Launch::TaskView { task_id: 4 }, TasksIntent::ViewTask)
        );
        assert_eq!(flow.on_input(&mut cx, Input::Pick(5)), Step::Stay);
    }
}

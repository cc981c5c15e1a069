//! Manual task list: chores done in turn, independent of any schedule

use crate::backend::{BackendError, BackendRequest, BackendResponse, TaskSummary};
use crate::dialog::{
    Button, Flow, FlowCx, FlowId, FlowResult, Input, Intent, Launch, Payload, PayloadKind, Step,
    View,
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "Manual tasks are done by people one by one independently of time.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualTasksIntent {
    NewTask,
    ViewTask,
}

impl Intent for ManualTasksIntent {
    fn expects(&self) -> PayloadKind {
        match self {
            Self::NewTask => PayloadKind::ManualTask,
            Self::ViewTask => PayloadKind::Nothing,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualTasks {
    tasks: Vec<TaskSummary>,
}

impl Flow for ManualTasks {
    type Intent = ManualTasksIntent;

    const ID: FlowId = FlowId::ManualTasks;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<Self::Intent> {
        Step::Call(BackendRequest::ListManualTasks)
    }

    fn on_input(&mut self, _cx: &mut FlowCx, input: Input) -> Step<Self::Intent> {
        match input {
            Input::Press(Button::CreateNew) => {
                Step::push(Launch::CreateManualTask, ManualTasksIntent::NewTask)
            }
            Input::Pick(id) if self.tasks.iter().any(|t| t.id == id) => Step::push(
                Launch::ManualTaskView { task_id: id },
                ManualTasksIntent::ViewTask,
            ),
            Input::Press(Button::Refresh) => Step::Call(BackendRequest::ListManualTasks),
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
                ManualTasksIntent::NewTask,
                FlowResult {
                    success: true,
                    payload: Payload::ManualTask(task),
                },
            ) => Step::Call(BackendRequest::CreateManualTask { task }),
            (ManualTasksIntent::NewTask, _) => Step::Stay,
            (ManualTasksIntent::ViewTask, _) => Step::Call(BackendRequest::ListManualTasks),
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
            (BackendRequest::CreateManualTask { .. }, Ok(_)) => {
                cx.notify("The task has been created");
                Step::Call(BackendRequest::ListManualTasks)
            }
            (_, Err(e)) => {
                cx.notify(e.user_message());
                Step::Stay
            }
            (request, Ok(response)) => {
                tracing::warn!(op = request.op(), ?response, "Unexpected reply in manual task list");
                Step::Stay
            }
        }
    }

    fn view(&self) -> View {
        let mut view = View::new(HEADER);
        for task in &self.tasks {
            let symbol = if task.inactive { '-' } else { '+' };
            view = view.item(format!("[{symbol}] {}", task.name), task.id);
        }
        view.button("Add a new task", Button::CreateNew)
            .button("Refresh", Button::Refresh)
            .button("Back", Button::Back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NewManualTask;

    fn listed() -> ManualTasks {
        let mut flow = ManualTasks::default();
        flow.on_reply(
            &mut FlowCx::default(),
            BackendRequest::ListManualTasks,
            Ok(BackendResponse::Tasks(vec![
                TaskSummary {
                    id: 6,
                    name: "Buy soap".into(),
                    inactive: false,
                },
                TaskSummary {
                    id: 9,
                    name: "Fix the tap".into(),
                    inactive: true,
                },
            ])),
        );
        flow
    }

    #[test]
    fn list_marks_inactive_tasks() {
        let view = listed().view();
        let labels: Vec<_> = view.options.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            ["[+] Buy soap", "[-] Fix the tap", "Add a new task", "Refresh", "Back"]
        );
    }

    #[test]
    fn finished_wizard_creates_the_task() {
        let mut flow = listed();
        let mut cx = FlowCx::default();
        let task = NewManualTask {
            name: "Buy soap".into(),
            description: None,
            order_id: Some(3),
        };
        let step = flow.on_result(
            &mut cx,
            ManualTasksIntent::NewTask,
            FlowResult::done(Payload::ManualTask(task.clone())),
        );
        assert_eq!(step, Step::Call(BackendRequest::CreateManualTask { task: task.clone() }));

        let step = flow.on_reply(
            &mut cx,
            BackendRequest::CreateManualTask { task },
            Ok(BackendResponse::Created(12)),
        );
        assert_eq!(step, Step::Call(BackendRequest::ListManualTasks));
        assert_eq!(cx.take_notices(), vec!["The task has been created".to_string()]);
    }

    #[test]
    fn only_listed_tasks_open() {
        let mut flow = listed();
        let mut cx = FlowCx::default();
        assert_eq!(
            flow.on_input(&mut cx, Input::Pick(9)),
            Step::push(
                Launch::ManualTaskView { task_id: 9 },
                ManualTasksIntent::ViewTask
            )
        );
        assert_eq!(flow.on_input(&mut cx, Input::Pick(4)), Step::Stay);
    }
}

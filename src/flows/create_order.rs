//! Build a rotation order out of the room's roommates

use super::Roster;
use crate::backend::{BackendError, BackendRequest, BackendResponse};
use crate::dialog::{Button, Flow, FlowCx, FlowId, FlowResult, Input, NoChild, Payload, Step, View};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderArgs {
    /// Offer "Set no order", finishing successfully without an id
    pub allow_none: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrder {
    allow_none: bool,
    roster: Roster,
    order: Vec<i64>,
}

impl CreateOrder {
    pub fn new(args: CreateOrderArgs) -> Self {
        Self {
            allow_none: args.allow_none,
            roster: Roster::default(),
            order: Vec::new(),
        }
    }
}

impl Flow for CreateOrder {
    type Intent = NoChild;

    const ID: FlowId = FlowId::CreateOrder;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<NoChild> {
        Step::Call(BackendRequest::GetRoomInfo)
    }

    fn on_input(&mut self, cx: &mut FlowCx, input: Input) -> Step<NoChild> {
        match input {
            Input::Pick(id) if self.roster.contains(id) => {
                self.order.push(id);
                Step::Stay
            }
            Input::Press(Button::Finish) if !self.order.is_empty() => {
                Step::Call(BackendRequest::CreateOrder {
                    users: self.order.clone(),
                })
            }
            Input::Press(Button::Skip) if self.allow_none => {
                cx.notify("No order was selected");
                Step::done(Payload::Empty)
            }
            Input::Press(Button::Cancel | Button::Back) => {
                cx.notify("Canceled");
                Step::cancel()
            }
            _ => Step::Stay,
        }
    }

    fn on_result(&mut self, _cx: &mut FlowCx, intent: NoChild, _result: FlowResult) -> Step<NoChild> {
        match intent {}
    }

    fn on_reply(
        &mut self,
        cx: &mut FlowCx,
        request: BackendRequest,
        outcome: Result<BackendResponse, BackendError>,
    ) -> Step<NoChild> {
        match (request, outcome) {
            (BackendRequest::GetRoomInfo, Ok(BackendResponse::Room(room))) => {
                self.roster = Roster::from_users(&room.users);
                Step::Stay
            }
            // Without roommates there is nothing to build
            (BackendRequest::GetRoomInfo, Err(e)) => {
                cx.notify(e.user_message());
                Step::cancel()
            }
            (BackendRequest::CreateOrder { .. }, Ok(BackendResponse::Created(id))) => {
                Step::done(Payload::Id(id))
            }
            (_, Err(e)) => {
                cx.notify(e.user_message());
                Step::Stay
            }
            (request, Ok(response)) => {
                tracing::warn!(op = request.op(), ?response, "Unexpected reply while building an order");
                Step::Stay
            }
        }
    }

    fn view(&self) -> View {
        let mut view = if self.order.is_empty() {
            View::new("Constructing an order...\nAdd the first member")
        } else {
            let mut view = View::new("Constructing an order...\nMembers:");
            for (pos, id) in self.order.iter().enumerate() {
                view = view.line(format!("{}) {}", pos + 1, self.roster.name(*id)));
            }
            view
        };
        for (id, name) in self.roster.iter() {
            view = view.item(name, id);
        }
        if self.allow_none {
            view = view.button("Set no order", Button::Skip);
        }
        view = view.button("Cancel", Button::Cancel);
        if !self.order.is_empty() {
            view = view.button("Finish", Button::Finish);
        }
        view
    }
}

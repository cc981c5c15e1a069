//! Pick one of the room's orders, create a new one, or leave it empty

use super::{CreateOrderArgs, Roster};
use crate::backend::{BackendError, BackendRequest, BackendResponse, OrderList};
use crate::dialog::{
    Button, Flow, FlowCx, FlowId, FlowResult, Input, Intent, Launch, Payload, PayloadKind, Step,
    View,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSelectionIntent {
    CreateOrder,
}

impl Intent for OrderSelectionIntent {
    fn expects(&self) -> PayloadKind {
        PayloadKind::Id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OrderEntry {
    id: i64,
    members: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSelection {
    orders: Vec<OrderEntry>,
    roster: Roster,
}

impl OrderSelection {
    fn load(&mut self, list: OrderList) {
        self.orders = list
            .orders
            .into_iter()
            .map(|(id, members)| OrderEntry { id, members })
            .collect();
        self.roster = Roster::from_users(&list.users);
    }
}

impl Flow for OrderSelection {
    type Intent = OrderSelectionIntent;

    const ID: FlowId = FlowId::OrderSelection;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<Self::Intent> {
        Step::Call(BackendRequest::ListOrders)
    }

    fn on_input(&mut self, cx: &mut FlowCx, input: Input) -> Step<Self::Intent> {
        match input {
            Input::Pick(id) if self.orders.iter().any(|o| o.id == id) => Step::done(Payload::Id(id)),
            Input::Pick(_) => {
                cx.notify("That order is no longer available");
                Step::Stay
            }
            Input::Press(Button::CreateNew) => Step::push(
                Launch::CreateOrder(CreateOrderArgs { allow_none: false }),
                OrderSelectionIntent::CreateOrder,
            ),
            Input::Press(Button::Skip) => Step::done(Payload::Empty),
            Input::Press(Button::Cancel | Button::Back) => Step::cancel(),
            Input::Press(_) | Input::Text(_) => Step::Stay,
        }
    }

    fn on_result(
        &mut self,
        _cx: &mut FlowCx,
        intent: Self::Intent,
        result: FlowResult,
    ) -> Step<Self::Intent> {
        match intent {
            // A new order exists: show it alongside the old ones
            OrderSelectionIntent::CreateOrder if result.success => {
                Step::Call(BackendRequest::ListOrders)
            }
            OrderSelectionIntent::CreateOrder => Step::Stay,
        }
    }

    fn on_reply(
        &mut self,
        cx: &mut FlowCx,
        _request: BackendRequest,
        outcome: Result<BackendResponse, BackendError>,
    ) -> Step<Self::Intent> {
        match outcome {
            Ok(BackendResponse::Orders(list)) => self.load(list),
            Ok(other) => tracing::warn!(response = ?other, "Unexpected reply to order listing"),
            Err(e) => cx.notify(e.user_message()),
        }
        Step::Stay
    }

    fn view(&self) -> View {
        let mut view = View::new("Select an order of roommates:");
        for (pos, order) in self.orders.iter().enumerate() {
            view = view.line(format!("{}) {}", pos + 1, self.roster.chain(&order.members)));
        }
        for (pos, order) in self.orders.iter().enumerate() {
            view = view.item(format!("{}", pos + 1), order.id);
        }
        view.button("Create new", Button::CreateNew)
            .button("Leave empty", Button::Skip)
            .button("Cancel", Button::Cancel)
    }
}

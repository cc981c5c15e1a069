//! Root flow: the room menu, or the welcome menu for users without a room
//!
//! Home sits at the bottom of every stack and never finishes. Which menu it
//! shows follows from the last room lookup.

use super::{ConfirmationArgs, PromptArgs, Roster, Validator};
use crate::backend::{BackendError, BackendRequest, BackendResponse, DailyInfo, RoomInfo};
use crate::dialog::{
    Button, Flow, FlowCx, FlowId, FlowResult, Input, Intent, Launch, Payload, PayloadKind, Step,
    View,
};
use serde::{Deserialize, Serialize};

const ROOM_NAME_MAX_LEN: usize = 100;

const WELCOME: &str = "Welcome!\n\nYou can:\n- Accept an invitation to a room\n- Create a new room";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HomeIntent {
    NameRoom,
    JoinRoom,
    Tasks,
    ManualTasks,
    Rules,
    Invitations,
    Leave,
}

impl Intent for HomeIntent {
    fn expects(&self) -> PayloadKind {
        match self {
            Self::NameRoom => PayloadKind::Text,
            Self::JoinRoom => PayloadKind::Id,
            Self::Tasks | Self::ManualTasks | Self::Rules | Self::Invitations | Self::Leave => {
                PayloadKind::Nothing
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RoomHeader {
    id: i64,
    name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Place {
    Loading,
    Roomless,
    Room {
        room: RoomHeader,
        roster: Roster,
        daily: Option<DailyInfo>,
        /// Roommates sub-screen is open
        roommates: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Home {
    place: Place,
}

impl Default for Home {
    fn default() -> Self {
        Self {
            place: Place::Loading,
        }
    }
}

impl Home {
    fn enter_room(&mut self, info: RoomInfo) {
        self.place = Place::Room {
            room: RoomHeader {
                id: info.id,
                name: info.name,
            },
            roster: Roster::from_users(&info.users),
            daily: None,
            roommates: false,
        };
    }

    fn roomless_input(&self, input: Input) -> Step<HomeIntent> {
        match input {
            Input::Press(Button::CreateNew) => Step::push(
                Launch::Prompt(
                    PromptArgs::new(
                        "a name for the room",
                        Validator::Text {
                            max_len: ROOM_NAME_MAX_LEN,
                        },
                    )
                    .with_cancel_notice("Canceled"),
                ),
                HomeIntent::NameRoom,
            ),
            Input::Press(Button::Invitations) => Step::push(
                Launch::IncomingInvitations { can_accept: true },
                HomeIntent::JoinRoom,
            ),
            Input::Press(Button::Refresh) => Step::Call(BackendRequest::GetRoomInfo),
            _ => Step::Stay,
        }
    }
}

impl Flow for Home {
    type Intent = HomeIntent;

    const ID: FlowId = FlowId::Home;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<Self::Intent> {
        Step::Call(BackendRequest::GetRoomInfo)
    }

    fn on_input(&mut self, _cx: &mut FlowCx, input: Input) -> Step<Self::Intent> {
        match self.place {
            Place::Loading => {
                return match input {
                    Input::Press(Button::Refresh) => Step::Call(BackendRequest::GetRoomInfo),
                    _ => Step::Stay,
                }
            }
            Place::Roomless => return self.roomless_input(input),
            Place::Room { .. } => {}
        }
        let Place::Room { roommates, .. } = &mut self.place else {
            return Step::Stay;
        };

        if *roommates {
            if let Input::Press(Button::Back | Button::Cancel) = input {
                *roommates = false;
                return Step::Call(BackendRequest::GetDailyInfo);
            }
            return Step::Stay;
        }

        match input {
            Input::Press(Button::Refresh) => Step::Call(BackendRequest::GetDailyInfo),
            // Names may have changed since the room was loaded
            Input::Press(Button::Roommates) => {
                *roommates = true;
                Step::Call(BackendRequest::GetRoomInfo)
            }
            Input::Press(Button::Tasks) => Step::push(Launch::Tasks, HomeIntent::Tasks),
            Input::Press(Button::ManualTasks) => {
                Step::push(Launch::ManualTasks, HomeIntent::ManualTasks)
            }
            Input::Press(Button::Rules) => Step::push(Launch::Rules, HomeIntent::Rules),
            Input::Press(Button::Invitations) => {
                Step::push(Launch::OutgoingInvitations, HomeIntent::Invitations)
            }
            Input::Press(Button::Leave) => Step::push(
                Launch::Confirmation(ConfirmationArgs::new("you want to leave the room")),
                HomeIntent::Leave,
            ),
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
                HomeIntent::NameRoom,
                FlowResult {
                    success: true,
                    payload: Payload::Text(name),
                },
            ) => Step::Call(BackendRequest::CreateRoom { name }),
            (
                HomeIntent::JoinRoom,
                FlowResult {
                    success: true,
                    payload: Payload::Id(_),
                },
            ) => Step::Call(BackendRequest::GetRoomInfo),
            (HomeIntent::Leave, FlowResult { success: true, .. }) => {
                Step::Call(BackendRequest::LeaveRoom)
            }
            // Anything may have changed today's duties
            (
                HomeIntent::Tasks
                | HomeIntent::ManualTasks
                | HomeIntent::Rules
                | HomeIntent::Invitations,
                _,
            )
                if matches!(self.place, Place::Room { .. }) =>
            {
                Step::Call(BackendRequest::GetDailyInfo)
            }
            _ => Step::Stay,
        }
    }

    fn on_reply(
        &mut self,
        cx: &mut FlowCx,
        request: BackendRequest,
        outcome: Result<BackendResponse, BackendError>,
    ) -> Step<Self::Intent> {
        match (request, outcome) {
            (BackendRequest::GetRoomInfo, Ok(BackendResponse::Room(info))) => {
                let keep_roommates = matches!(
                    &self.place,
                    Place::Room { room, roommates: true, .. } if room.id == info.id
                );
                self.enter_room(info);
                if keep_roommates {
                    if let Place::Room { roommates, .. } = &mut self.place {
                        *roommates = true;
                    }
                    return Step::Stay;
                }
                Step::Call(BackendRequest::GetDailyInfo)
            }
            (BackendRequest::GetRoomInfo, Err(e)) if e.is_no_room() => {
                if matches!(self.place, Place::Room { .. }) {
                    cx.notify(e.user_message());
                }
                self.place = Place::Roomless;
                Step::Stay
            }
            // Any other failure leaves the user where they were
            (BackendRequest::GetRoomInfo, Err(e)) => {
                if let Place::Room { roommates, .. } = &mut self.place {
                    *roommates = false;
                }
                cx.notify(e.user_message());
                Step::Stay
            }
            (BackendRequest::GetDailyInfo, Ok(BackendResponse::Daily(info))) => {
                if let Place::Room { daily, .. } = &mut self.place {
                    *daily = Some(info);
                }
                Step::Stay
            }
            (BackendRequest::CreateRoom { .. }, Ok(_)) => {
                cx.notify("The room has been created");
                Step::Call(BackendRequest::GetRoomInfo)
            }
            (BackendRequest::LeaveRoom, Ok(_)) => {
                cx.notify("You left the room");
                self.place = Place::Roomless;
                Step::Stay
            }
            (_, Err(e)) => {
                cx.notify(e.user_message());
                Step::Stay
            }
            (request, Ok(response)) => {
                tracing::warn!(op = request.op(), ?response, "Unexpected reply on home screen");
                Step::Stay
            }
        }
    }

    fn view(&self) -> View {
        match &self.place {
            Place::Loading => View::new("Loading...").button("Refresh", Button::Refresh),
            Place::Roomless => View::new(WELCOME)
                .button("Invitations", Button::Invitations)
                .button("Create", Button::CreateNew)
                .button("Refresh", Button::Refresh),
            Place::Room {
                roster,
                roommates: true,
                ..
            } => {
                let mut view = View::new("Roommates:");
                for (pos, (_, name)) in roster.iter().enumerate() {
                    view = view.line(format!("{}. {name}", pos + 1));
                }
                view.button("Back", Button::Back)
            }
            Place::Room {
                room,
                roster,
                daily,
                ..
            } => {
                let mut view = View::new(format!("Your room: {}\nID: {}\n", room.name, room.id));
                match daily {
                    Some(daily) if daily.tasks.is_empty() => view = view.line("Nothing to do today"),
                    Some(daily) => {
                        view = view.line("Today:");
                        for task in &daily.tasks {
                            let who = task
                                .today_user_id
                                .map_or_else(|| "nobody".to_string(), |id| roster.name(id));
                            view = view.line(format!("- {}: {who}", task.name));
                        }
                    }
                    None => {}
                }
                view.button("Refresh", Button::Refresh)
                    .button("Roommates", Button::Roommates)
                    .button("Tasks", Button::Tasks)
                    .button("Manual tasks", Button::ManualTasks)
                    .button("Rules", Button::Rules)
                    .button("My invitations", Button::Invitations)
                    .button("Leave", Button::Leave)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DailyTask, UserInfo, NO_ROOM};

    fn room() -> RoomInfo {
        RoomInfo {
            id: 1,
            name: "Flat 9".into(),
            users: vec![UserInfo {
                id: 10,
                alias: None,
                fullname: Some("Anna".into()),
            }],
        }
    }

    fn in_room() -> Home {
        let mut home = Home::default();
        let mut cx = FlowCx::default();
        home.on_reply(&mut cx, BackendRequest::GetRoomInfo, Ok(BackendResponse::Room(room())));
        home.on_reply(
            &mut cx,
            BackendRequest::GetDailyInfo,
            Ok(BackendResponse::Daily(DailyInfo {
                tasks: vec![DailyTask {
                    id: 4,
                    name: "Dishes".into(),
                    today_user_id: Some(10),
                }],
            })),
        );
        home
    }

    #[test]
    fn room_is_loaded_then_daily_info() {
        let mut home = Home::default();
        let step = home.on_reply(
            &mut FlowCx::default(),
            BackendRequest::GetRoomInfo,
            Ok(BackendResponse::Room(room())),
        );
        assert_eq!(step, Step::Call(BackendRequest::GetDailyInfo));
        assert!(in_room().view().text.contains("- Dishes: Anna"));
    }

    #[test]
    fn missing_room_shows_welcome_without_notice() {
        let mut home = Home::default();
        let mut cx = FlowCx::default();
        home.on_reply(
            &mut cx,
            BackendRequest::GetRoomInfo,
            Err(BackendError::domain(NO_ROOM, "User doesn't have a room")),
        );
        assert!(cx.take_notices().is_empty());
        assert!(home.view().text.starts_with("Welcome!"));
        assert!(matches!(
            home.on_input(&mut cx, Input::Press(Button::CreateNew)),
            Step::Push {
                intent: HomeIntent::NameRoom,
                ..
            }
        ));
    }

    #[test]
    fn failed_lookup_in_the_room_keeps_the_room() {
        let mut home = in_room();
        let mut cx = FlowCx::default();
        home.on_input(&mut cx, Input::Press(Button::Roommates));

        let step = home.on_reply(
            &mut cx,
            BackendRequest::GetRoomInfo,
            Err(BackendError::Transport("connection reset".into())),
        );

        assert_eq!(step, Step::Stay);
        assert!(matches!(home.place, Place::Room { roommates: false, .. }));
        assert!(home.view().text.starts_with("Your room: Flat 9"));
        assert_eq!(
            cx.take_notices(),
            vec!["The server is unavailable right now. Try again later.".to_string()]
        );
    }

    #[test]
    fn failed_first_load_can_be_retried() {
        let mut home = Home::default();
        let mut cx = FlowCx::default();
        home.on_reply(
            &mut cx,
            BackendRequest::GetRoomInfo,
            Err(BackendError::Timeout(std::time::Duration::from_secs(5))),
        );
        assert_eq!(home.place, Place::Loading);
        assert_eq!(cx.take_notices().len(), 1);
        assert_eq!(
            home.on_input(&mut cx, Input::Press(Button::Refresh)),
            Step::Call(BackendRequest::GetRoomInfo)
        );
    }

    #[test]
    fn welcome_menu_offers_a_refresh() {
        let mut home = Home::default();
        let mut cx = FlowCx::default();
        home.on_reply(
            &mut cx,
            BackendRequest::GetRoomInfo,
            Err(BackendError::domain(NO_ROOM, "User doesn't have a room")),
        );
        assert!(home
            .view()
            .options
            .iter()
            .any(|c| c.input == Input::Press(Button::Refresh)));
        assert_eq!(
            home.on_input(&mut cx, Input::Press(Button::Refresh)),
            Step::Call(BackendRequest::GetRoomInfo)
        );
    }

    #[test]
    fn roommates_screen_returns_with_a_refresh() {
        let mut home = in_room();
        let mut cx = FlowCx::default();
        assert_eq!(
            home.on_input(&mut cx, Input::Press(Button::Roommates)),
            Step::Call(BackendRequest::GetRoomInfo)
        );
        let step = home.on_reply(&mut cx, BackendRequest::GetRoomInfo, Ok(BackendResponse::Room(room())));
        assert_eq!(step, Step::Stay);
        assert!(home.view().text.contains("1. Anna"));

        assert_eq!(
            home.on_input(&mut cx, Input::Press(Button::Back)),
            Step::Call(BackendRequest::GetDailyInfo)
        );
    }

    #[test]
    fn leaving_makes_the_user_roomless() {
        let mut home = in_room();
        let mut cx = FlowCx::default();
        assert_eq!(
            home.on_result(&mut cx, HomeIntent::Leave, FlowResult::done(Payload::Empty)),
            Step::Call(BackendRequest::LeaveRoom)
        );
        home.on_reply(&mut cx, BackendRequest::LeaveRoom, Ok(BackendResponse::Done));
        assert_eq!(home.place, Place::Roomless);
        assert_eq!(cx.take_notices(), vec!["You left the room".to_string()]);
    }

    #[test]
    fn closed_submenu_refreshes_daily_info() {
        let mut home = in_room();
        assert_eq!(
            home.on_result(&mut FlowCx::default(), HomeIntent::Tasks, FlowResult::done(Payload::Empty)),
            Step::Call(BackendRequest::GetDailyInfo)
        );
    }
}

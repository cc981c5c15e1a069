//! Invitations: the ones this user sent, and the ones addressed to them

use super::{ConfirmationArgs, PromptArgs, Validator};
use crate::backend::{
    BackendError, BackendRequest, BackendResponse, IncomingInvitation, SentInvitation,
};
use crate::dialog::{
    Button, Flow, FlowCx, FlowId, FlowResult, Input, Intent, Launch, Payload, PayloadKind, Step,
    View,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Sent
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutgoingIntent {
    EnterAlias,
    Delete { id: i64 },
}

impl Intent for OutgoingIntent {
    fn expects(&self) -> PayloadKind {
        match self {
            Self::EnterAlias => PayloadKind::Text,
            Self::Delete { .. } => PayloadKind::Nothing,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingInvitations {
    invitations: Vec<SentInvitation>,
}

impl Flow for OutgoingInvitations {
    type Intent = OutgoingIntent;

    const ID: FlowId = FlowId::OutgoingInvitations;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<Self::Intent> {
        Step::Call(BackendRequest::SentInvitations)
    }

    fn on_input(&mut self, _cx: &mut FlowCx, input: Input) -> Step<Self::Intent> {
        match input {
            Input::Press(Button::CreateNew) => Step::push(
                Launch::Prompt(
                    PromptArgs::new("a user's alias", Validator::Alias).with_cancel_notice("Canceled"),
                ),
                OutgoingIntent::EnterAlias,
            ),
            Input::Pick(id) => match self.invitations.iter().find(|i| i.id == id) {
                Some(invitation) => Step::push(
                    Launch::Confirmation(
                        ConfirmationArgs::new(format!(
                            "you want to delete the invitation to @{}",
                            invitation.addressee
                        ))
                        .on_yes("Deleted"),
                    ),
                    OutgoingIntent::Delete { id },
                ),
                None => Step::Stay,
            },
            Input::Press(Button::Refresh) => Step::Call(BackendRequest::SentInvitations),
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
                OutgoingIntent::EnterAlias,
                FlowResult {
                    success: true,
                    payload: Payload::Text(alias),
                },
            ) => Step::Call(BackendRequest::Invite { alias }),
            (OutgoingIntent::Delete { id }, FlowResult { success: true, .. }) => {
                Step::Call(BackendRequest::DeleteInvitation { id })
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
            (_, Ok(BackendResponse::Sent(invitations))) => {
                self.invitations = invitations;
                Step::Stay
            }
            (BackendRequest::Invite { .. }, Ok(_)) => {
                cx.notify("The invitation has been sent");
                Step::Call(BackendRequest::SentInvitations)
            }
            (BackendRequest::DeleteInvitation { .. }, Ok(_)) => {
                Step::Call(BackendRequest::SentInvitations)
            }
            (_, Err(e)) => {
                cx.notify(e.user_message());
                Step::Stay
            }
            (request, Ok(response)) => {
                tracing::warn!(op = request.op(), ?response, "Unexpected reply in sent invitations");
                Step::Stay
            }
        }
    }

    fn view(&self) -> View {
        let mut view = View::new("Your invitations to this room:");
        if self.invitations.is_empty() {
            view = view.line("No invitations :(");
        }
        for (pos, invitation) in self.invitations.iter().enumerate() {
            view = view.line(format!("{}) to @{}", pos + 1, invitation.addressee));
        }
        for (pos, invitation) in self.invitations.iter().enumerate() {
            view = view.item(format!("Delete {}", pos + 1), invitation.id);
        }
        view.button("Invite a person", Button::CreateNew)
            .button("Back", Button::Back)
    }
}

// ============================================================================
// Incoming
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomingIntent {
    Accept { id: i64 },
    Reject { id: i64 },
}

impl Intent for IncomingIntent {
    fn expects(&self) -> PayloadKind {
        PayloadKind::Nothing
    }
}

/// Finishes with the joined room's id once an invitation is accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingInvitations {
    /// False while the user already lives in a room
    can_accept: bool,
    invitations: Vec<IncomingInvitation>,
    selected: Option<i64>,
}

impl IncomingInvitations {
    pub fn new(can_accept: bool) -> Self {
        Self {
            can_accept,
            invitations: Vec::new(),
            selected: None,
        }
    }

    fn selected_invitation(&self) -> Option<&IncomingInvitation> {
        let id = self.selected?;
        self.invitations.iter().find(|i| i.id == id)
    }

    fn confirm(&self, accept: bool) -> Step<IncomingIntent> {
        let Some(invitation) = self.selected_invitation() else {
            return Step::Stay;
        };
        let (verb, done, intent) = if accept {
            ("accept", "Accepted", IncomingIntent::Accept { id: invitation.id })
        } else {
            ("reject", "Rejected", IncomingIntent::Reject { id: invitation.id })
        };
        Step::push(
            Launch::Confirmation(
                ConfirmationArgs::new(format!(
                    "you want to {verb} the invitation to {}",
                    invitation.room_name
                ))
                .on_yes(done),
            ),
            intent,
        )
    }
}

impl Flow for IncomingInvitations {
    type Intent = IncomingIntent;

    const ID: FlowId = FlowId::IncomingInvitations;

    fn on_start(&mut self, _cx: &mut FlowCx) -> Step<Self::Intent> {
        Step::Call(BackendRequest::IncomingInvitations)
    }

    fn on_input(&mut self, cx: &mut FlowCx, input: Input) -> Step<Self::Intent> {
        match input {
            Input::Pick(id) if self.invitations.iter().any(|i| i.id == id) => {
                self.selected = Some(id);
                Step::Stay
            }
            Input::Press(Button::Accept) if !self.can_accept => {
                cx.notify("Leave your current room before accepting an invitation");
                Step::Stay
            }
            Input::Press(Button::Accept) => self.confirm(true),
            Input::Press(Button::Reject) => self.confirm(false),
            Input::Press(Button::Refresh) => Step::Call(BackendRequest::IncomingInvitations),
            Input::Press(Button::Back) if self.selected.is_some() => {
                self.selected = None;
                Step::Stay
            }
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
        if !result.success {
            return Step::Stay;
        }
        match intent {
            IncomingIntent::Accept { id } => Step::Call(BackendRequest::AcceptInvitation { id }),
            IncomingIntent::Reject { id } => Step::Call(BackendRequest::RejectInvitation { id }),
        }
    }

    fn on_reply(
        &mut self,
        cx: &mut FlowCx,
        request: BackendRequest,
        outcome: Result<BackendResponse, BackendError>,
    ) -> Step<Self::Intent> {
        match (request, outcome) {
            (_, Ok(BackendResponse::Incoming(invitations))) => {
                self.invitations = invitations;
                if self.selected_invitation().is_none() {
                    self.selected = None;
                }
                Step::Stay
            }
            (BackendRequest::AcceptInvitation { .. }, Ok(BackendResponse::Created(room))) => {
                Step::done(Payload::Id(room))
            }
            (BackendRequest::RejectInvitation { .. }, Ok(_)) => {
                self.selected = None;
                Step::Call(BackendRequest::IncomingInvitations)
            }
            (_, Err(e)) => {
                cx.notify(e.user_message());
                Step::Stay
            }
            (request, Ok(response)) => {
                tracing::warn!(op = request.op(), ?response, "Unexpected reply in incoming invitations");
                Step::Stay
            }
        }
    }

    fn view(&self) -> View {
        if let Some(invitation) = self.selected_invitation() {
            let mut view = View::new(format!(
                "Invitation to \"{}\" from {}",
                invitation.room_name,
                invitation.sender.display_name()
            ));
            if self.can_accept {
                view = view.button("Accept", Button::Accept);
            }
            return view
                .button("Reject", Button::Reject)
                .button("Back", Button::Back);
        }

        let mut view = View::new("Incoming invitations:");
        if self.invitations.is_empty() {
            view = view.line("No invitations :(");
        }
        for (pos, invitation) in self.invitations.iter().enumerate() {
            view = view.line(format!(
                "{}) to \"{}\" from {}",
                pos + 1,
                invitation.room_name,
                invitation.sender.display_name()
            ));
        }
        for (pos, invitation) in self.invitations.iter().enumerate() {
            view = view.item(format!("{}", pos + 1), invitation.id);
        }
        view.button("Back", Button::Back)
    }
}

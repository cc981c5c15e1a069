//! Backend error taxonomy

use std::time::Duration;
use thiserror::Error;

/// Domain code the backend answers with when the user has no room
pub const NO_ROOM: i64 = 1;

/// Failure of a backend call, classified for retry decisions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// The backend understood the request and refused it
    #[error("{}", domain_text(.code, .detail))]
    Domain { code: Option<i64>, detail: String },
    /// Non-success HTTP status without a domain error body
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected backend response: {0}")]
    Decode(String),
}

fn domain_text(code: &Option<i64>, detail: &str) -> String {
    match code {
        Some(code) => format!("{code}. {detail}"),
        None => detail.to_string(),
    }
}

impl BackendError {
    pub fn domain(code: i64, detail: impl Into<String>) -> Self {
        Self::Domain {
            code: Some(code),
            detail: detail.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Domain { .. } | Self::Decode(_) => false,
        }
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain { .. })
    }

    /// The user is not a member of any room
    pub fn is_no_room(&self) -> bool {
        matches!(self, Self::Domain { code: Some(NO_ROOM), .. })
    }

    /// Text shown to the end user when a step surfaces this failure
    pub fn user_message(&self) -> String {
        match self {
            Self::Domain { code, detail } => domain_text(code, detail),
            Self::Timeout(_) => "The server is taking too long to answer. Try again later.".into(),
            Self::Transport(_) | Self::Status { .. } | Self::Decode(_) => {
                "The server is unavailable right now. Try again later.".into()
            }
        }
    }
}

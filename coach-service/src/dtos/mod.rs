//! Request and response bodies for the HTTP API.

use crate::models::{Phase, Turn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const MAX_MESSAGE_CHARS: u64 = 4000;

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TurnRequest {
    #[validate(length(min = 1, message = "session_id is required"))]
    pub session_id: String,
    #[validate(length(max = MAX_MESSAGE_CHARS, message = "user_msg is too long"))]
    pub user_msg: String,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub question: String,
    pub next_phase: Phase,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SetUsernameRequest {
    #[validate(length(min = 1, message = "session_id is required"))]
    pub session_id: String,
    #[validate(length(min = 1, max = 100, message = "username must be 1 to 100 characters"))]
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct UsernameResponse {
    pub session_id: String,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TurnView {
    pub user_msg: String,
    pub question: String,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
}

impl From<Turn> for TurnView {
    fn from(turn: Turn) -> Self {
        Self {
            user_msg: turn.user_text,
            question: turn.coach_question,
            phase: turn.phase,
            created_at: turn.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub username: Option<String>,
    pub turns: Vec<TurnView>,
}

//! Session model holding the ordered turn log of one conversation.

use super::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A coaching conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub session_id: String,

    /// Optional display name chosen by the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Turns in submission order.
    pub turns: Vec<Turn>,

    /// When the session was created.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// One user message paired with the coach question produced for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub user_text: String,
    pub coach_question: String,
    pub phase: Phase,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with a freshly generated identifier.
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create an empty session for a caller-supplied identifier.
    pub fn with_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            display_name: None,
            turns: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Append a turn to the end of the log.
    pub fn append_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Turn {
    pub fn new(user_text: impl Into<String>, coach_question: impl Into<String>, phase: Phase) -> Self {
        Self {
            user_text: user_text.into(),
            coach_question: coach_question.into(),
            phase,
            created_at: Utc::now(),
        }
    }
}

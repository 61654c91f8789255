//! A chat participant and the chibi they own in one room.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::operator::OperatorState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chatter {
    pub username: String,
    pub display_name: String,
    pub state: OperatorState,
    pub last_chat_at: DateTime<Utc>,
    pub active: bool,
}

impl Chatter {
    pub fn new(
        username: impl Into<String>,
        display_name: impl Into<String>,
        state: OperatorState,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
            state,
            last_chat_at: now,
            active: true,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_chat_at = now;
        self.active = true;
    }

    /// True if the chatter spoke within `period` of `now`.
    pub fn is_active_within(&self, now: DateTime<Utc>, period: Duration) -> bool {
        now.signed_duration_since(self.last_chat_at) <= period
    }
}

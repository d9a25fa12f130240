//! Conversation entity - a direct or group thread with a fixed participant set

use chrono::{DateTime, Utc};

use crate::value_objects::Snowflake;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: Snowflake,
    pub name: Option<String>,
    pub is_group: bool,
    pub participants: Vec<Snowflake>,
    pub latest_message_id: Option<Snowflake>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// One-to-one conversation between two users
    pub fn direct(id: Snowflake, a: Snowflake, b: Snowflake) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: None,
            is_group: false,
            participants: vec![a, b],
            latest_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn group(id: Snowflake, name: impl Into<String>, participants: Vec<Snowflake>) -> Self {
        let now = Utc::now();
        let mut participants = participants;
        participants.sort_unstable();
        participants.dedup();
        Self {
            id,
            name: Some(name.into()),
            is_group: true,
            participants,
            latest_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_participant(&self, user_id: Snowflake) -> bool {
        self.participants.contains(&user_id)
    }

    /// Point the conversation at its newest message
    pub fn set_latest_message(&mut self, message_id: Snowflake) {
        self.latest_message_id = Some(message_id);
        self.updated_at = Utc::now();
    }
}

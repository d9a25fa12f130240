//! Conversation model -> entity mapper

use chat_core::{Conversation, Snowflake};

use crate::models::ConversationModel;

impl ConversationModel {
    /// Attach the participant rows loaded for this conversation
    pub fn into_entity(self, participants: Vec<i64>) -> Conversation {
        Conversation {
            id: Snowflake::new(self.id),
            name: self.name,
            is_group: self.is_group,
            participants: participants.into_iter().map(Snowflake::new).collect(),
            latest_message_id: self.latest_message_id.map(Snowflake::new),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

//! Entity -> DTO mappers

use chat_core::{Message, Profile};

use super::responses::{MessageResponse, ReadReceiptResponse, UserResponse};

impl From<&Profile> for UserResponse {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            username: profile.username.clone(),
            avatar: profile.avatar.clone(),
        }
    }
}

impl MessageResponse {
    pub fn new(message: &Message, sender: &Profile) -> Self {
        let attachment = message.content.attachment();
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender: UserResponse::from(sender),
            content: message.content.body().map(str::to_string),
            message_type: message.kind(),
            file_url: attachment.map(|a| a.url.clone()),
            file_name: attachment.and_then(|a| a.file_name.clone()),
            created_at: message.created_at,
            read_by: message
                .read_by
                .iter()
                .map(|r| ReadReceiptResponse {
                    user_id: r.user_id,
                    read_at: r.read_at,
                })
                .collect(),
        }
    }
}

//! Message entity <-> model mapper
//!
//! The tagged [`MessageContent`] is flattened into `kind`/`body`/`file_url`/
//! `file_name` columns and rebuilt (and re-validated) on the way back.

use chat_core::{
    AttachmentRef, DomainError, Message, MessageContent, MessageKind, ReadReceipt, Snowflake,
};

use crate::models::{MessageModel, MessageReadModel};

/// Column values for inserting message content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageColumns<'a> {
    pub kind: &'static str,
    pub body: Option<&'a str>,
    pub file_url: Option<&'a str>,
    pub file_name: Option<&'a str>,
}

impl<'a> MessageColumns<'a> {
    pub fn new(content: &'a MessageContent) -> Self {
        let attachment = content.attachment();
        Self {
            kind: content.kind().as_str(),
            body: content.body(),
            file_url: attachment.map(|a| a.url.as_str()),
            file_name: attachment.and_then(|a| a.file_name.as_deref()),
        }
    }
}

impl MessageModel {
    /// Rebuild the entity from its row and its read-receipt rows
    pub fn into_message(self, reads: Vec<MessageReadModel>) -> Result<Message, DomainError> {
        let kind: MessageKind = self.kind.parse()?;
        let attachment = self.file_url.map(|url| AttachmentRef {
            url,
            file_name: self.file_name,
        });
        let content = MessageContent::from_parts(kind, self.body, attachment)
            .map_err(|e| DomainError::DatabaseError(format!("corrupt message {}: {e}", self.id)))?;

        Ok(Message {
            id: Snowflake::new(self.id),
            conversation_id: Snowflake::new(self.conversation_id),
            sender_id: Snowflake::new(self.sender_id),
            content,
            created_at: self.created_at,
            read_by: reads
                .into_iter()
                .map(|r| ReadReceipt {
                    user_id: Snowflake::new(r.user_id),
                    read_at: r.read_at,
                })
                .collect(),
        })
    }
}

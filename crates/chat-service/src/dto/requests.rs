//! Request DTOs for gateway operations
//!
//! Field names follow the camelCase wire format clients already speak.

use serde::{Deserialize, Serialize};
use validator::Validate;

use chat_core::{AttachmentRef, DomainError, MessageContent, MessageKind, Snowflake};

/// Join, leave and mark-read all address a single conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    pub conversation_id: Snowflake,
}

/// Send-message request.
///
/// `message_type` stays a raw string here so an unknown type is reported on
/// the acknowledgment instead of failing frame decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: Snowflake,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 4000, message = "Message content too long"))]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2048, message = "File URL too long"))]
    pub file_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 255, message = "File name too long"))]
    pub file_name: Option<String>,
}

impl SendMessageRequest {
    pub fn text(conversation_id: Snowflake, content: impl Into<String>) -> Self {
        Self {
            conversation_id,
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn attachment(
        conversation_id: Snowflake,
        kind: MessageKind,
        file_url: Option<String>,
        file_name: Option<String>,
    ) -> Self {
        Self {
            conversation_id,
            message_type: Some(kind.as_str().to_string()),
            file_url,
            file_name,
            ..Self::default()
        }
    }

    /// Message kind, defaulting to text
    pub fn kind(&self) -> Result<MessageKind, DomainError> {
        self.message_type
            .as_deref()
            .map_or(Ok(MessageKind::Text), str::parse)
    }

    /// Turn the loose wire fields into tagged content
    pub fn to_content(&self) -> Result<MessageContent, DomainError> {
        let attachment = self.file_url.clone().map(|url| AttachmentRef {
            url,
            file_name: self.file_name.clone(),
        });
        MessageContent::from_parts(self.kind()?, self.content.clone(), attachment)
    }
}

//! Response DTOs pushed to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chat_core::{AttachmentRef, MessageContent, MessageKind, Snowflake};

/// Public user fields embedded in other payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Snowflake,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceiptResponse {
    pub user_id: Snowflake,
    pub read_at: DateTime<Utc>,
}

/// A persisted message as delivered to every participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Snowflake,
    pub conversation_id: Snowflake,
    pub sender: UserResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub message_type: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read_by: Vec<ReadReceiptResponse>,
}

impl MessageResponse {
    /// Conversation list preview, e.g. "📷 Photo" for a captionless image
    pub fn preview_text(&self) -> String {
        let attachment = self.file_url.clone().map(|url| AttachmentRef {
            url,
            file_name: self.file_name.clone(),
        });
        MessageContent::from_parts(self.message_type, self.content.clone(), attachment)
            .map(|content| content.preview_text())
            .unwrap_or_else(|_| self.content.clone().unwrap_or_default())
    }
}

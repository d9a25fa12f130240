//! Message entity - a persisted chat message and its tagged content

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Wire-level message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
    Video,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
            Self::Video => "video",
            Self::System => "system",
        }
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "file" => Ok(Self::File),
            "video" => Ok(Self::Video),
            "system" => Ok(Self::System),
            other => Err(DomainError::ValidationError(format!(
                "unknown message type: {other}"
            ))),
        }
    }
}

/// Reference to externally stored attachment bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub url: String,
    pub file_name: Option<String>,
}

impl AttachmentRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Message body. A text message always has a non-empty body; everything
/// else always carries an attachment and may have a caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text {
        body: String,
    },
    Attachment {
        kind: MessageKind,
        attachment: AttachmentRef,
        body: Option<String>,
    },
}

impl MessageContent {
    /// Build content from loosely typed request fields.
    ///
    /// Fails with [`DomainError::AttachmentMissing`] for a non-text kind without
    /// an attachment url, and [`DomainError::ContentRequired`] for text whose
    /// body is empty after trimming.
    pub fn from_parts(
        kind: MessageKind,
        body: Option<String>,
        attachment: Option<AttachmentRef>,
    ) -> Result<Self, DomainError> {
        let body = body.filter(|b| !b.trim().is_empty());

        if kind.is_text() {
            return body
                .map(|body| Self::Text { body })
                .ok_or(DomainError::ContentRequired);
        }

        match attachment {
            Some(attachment) if !attachment.url.trim().is_empty() => Ok(Self::Attachment {
                kind,
                attachment,
                body,
            }),
            _ => Err(DomainError::AttachmentMissing(kind)),
        }
    }

    pub fn text(body: impl Into<String>) -> Result<Self, DomainError> {
        Self::from_parts(MessageKind::Text, Some(body.into()), None)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Text { .. } => MessageKind::Text,
            Self::Attachment { kind, .. } => *kind,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Text { body } => Some(body),
            Self::Attachment { body, .. } => body.as_deref(),
        }
    }

    pub fn attachment(&self) -> Option<&AttachmentRef> {
        match self {
            Self::Text { .. } => None,
            Self::Attachment { attachment, .. } => Some(attachment),
        }
    }

    /// Short human-readable summary used for conversation list previews
    pub fn preview_text(&self) -> String {
        if let Some(body) = self.body() {
            return body.to_string();
        }
        match self {
            Self::Text { body } => body.clone(),
            Self::Attachment {
                kind, attachment, ..
            } => match kind {
                MessageKind::Image => "📷 Photo".to_string(),
                MessageKind::Video => "🎬 Video".to_string(),
                MessageKind::File => attachment
                    .file_name
                    .clone()
                    .unwrap_or_else(|| "📎 Attachment".to_string()),
                MessageKind::System | MessageKind::Text => "System message".to_string(),
            },
        }
    }
}

/// One user's read marker on a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub user_id: Snowflake,
    pub read_at: DateTime<Utc>,
}

/// A message as persisted by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Snowflake,
    pub conversation_id: Snowflake,
    pub sender_id: Snowflake,
    pub content: MessageContent,
    pub created_at: DateTime<Utc>,
    pub read_by: Vec<ReadReceipt>,
}

impl Message {
    /// Materialize a draft. The sender is recorded as having read the
    /// message at creation time.
    pub fn from_draft(id: Snowflake, draft: NewMessage, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            conversation_id: draft.conversation_id,
            sender_id: draft.sender_id,
            content: draft.content,
            created_at,
            read_by: vec![ReadReceipt {
                user_id: draft.sender_id,
                read_at: created_at,
            }],
        }
    }

    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.content.kind()
    }

    pub fn is_read_by(&self, user_id: Snowflake) -> bool {
        self.read_by.iter().any(|r| r.user_id == user_id)
    }

    /// Record a read receipt; returns false if the user had already read it
    pub fn mark_read(&mut self, user_id: Snowflake, at: DateTime<Utc>) -> bool {
        if self.is_read_by(user_id) {
            return false;
        }
        self.read_by.push(ReadReceipt {
            user_id,
            read_at: at,
        });
        true
    }

    pub fn preview_text(&self) -> String {
        self.content.preview_text()
    }
}

/// Validated input for [`crate::Store::create_message`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: Snowflake,
    pub sender_id: Snowflake,
    pub content: MessageContent,
}

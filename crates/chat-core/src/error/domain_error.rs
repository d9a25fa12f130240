//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::entities::MessageKind;
use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(Snowflake),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(Snowflake),

    #[error("Message not found: {0}")]
    MessageNotFound(Snowflake),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Attachment missing for {0} message")]
    AttachmentMissing(MessageKind),

    #[error("Message content required")]
    ContentRequired,

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("User {user_id} is not a participant of conversation {conversation_id}")]
    NotAParticipant {
        conversation_id: Snowflake,
        user_id: Snowflake,
    },

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for wire responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::ConversationNotFound(_) => "UNKNOWN_CONVERSATION",
            Self::MessageNotFound(_) => "UNKNOWN_MESSAGE",

            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::AttachmentMissing(_) => "ATTACHMENT_MISSING",
            Self::ContentRequired => "CONTENT_REQUIRED",

            Self::NotAParticipant { .. } => "NOT_A_PARTICIPANT",

            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_) | Self::ConversationNotFound(_) | Self::MessageNotFound(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::AttachmentMissing(_) | Self::ContentRequired
        )
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::NotAParticipant { .. })
    }

    /// I/O failures of a collaborator; callers report these generically
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::InternalError(_))
    }
}

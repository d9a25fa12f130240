//! Service layer error types
//!
//! Every failure a client can observe. Auth errors refuse the connection
//! attempt; everything else is reported on the request's acknowledgment and
//! leaves the connection open.

use chat_common::AppError;
use chat_core::DomainError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Auth,
    Authorization,
    Validation,
    NotFound,
    Transient,
}

#[derive(Debug)]
pub enum ServiceError {
    /// No credential presented
    AuthMissing,

    /// Credential names an identity the directory does not know
    InvalidIdentity,

    /// Credential rejected or directory lookup failed
    AuthFailure(String),

    /// Send into a conversation that does not exist or excludes the sender
    NotAuthorized,

    /// Join of a conversation the user does not participate in
    NotAParticipant,

    ConversationNotFound,

    AttachmentMissing,

    ContentRequired,

    /// Malformed request field
    Validation(String),

    /// Directory or store I/O failure; `operation` picks the wire text
    Unavailable {
        operation: &'static str,
        reason: String,
    },
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthFailure(reason) => write!(f, "Auth failed: {reason}"),
            Self::Unavailable { operation, reason } => {
                write!(f, "Failed to {operation}: {reason}")
            }
            _ => f.write_str(&self.client_message()),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unavailable(operation: &'static str, reason: impl fmt::Display) -> Self {
        Self::Unavailable {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Text sent to the client. Never includes internal failure details.
    pub fn client_message(&self) -> String {
        match self {
            Self::AuthMissing => "Auth missing".to_string(),
            Self::InvalidIdentity => "Invalid User".to_string(),
            Self::AuthFailure(_) => "Auth failed".to_string(),
            Self::NotAuthorized => "Not authorized".to_string(),
            Self::NotAParticipant => "Not authorized to join this chat".to_string(),
            Self::ConversationNotFound => "Chat not found".to_string(),
            Self::AttachmentMissing => "Attachment missing".to_string(),
            Self::ContentRequired => "Message content required".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::Unavailable { operation, .. } => format!("Failed to {operation}"),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthMissing => "AUTH_MISSING",
            Self::InvalidIdentity => "INVALID_IDENTITY",
            Self::AuthFailure(_) => "AUTH_FAILURE",
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::NotAParticipant => "NOT_A_PARTICIPANT",
            Self::ConversationNotFound => "CONVERSATION_NOT_FOUND",
            Self::AttachmentMissing => "ATTACHMENT_MISSING",
            Self::ContentRequired => "CONTENT_REQUIRED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unavailable { .. } => "UNAVAILABLE",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthMissing | Self::InvalidIdentity | Self::AuthFailure(_) => ErrorCategory::Auth,
            Self::NotAuthorized | Self::NotAParticipant => ErrorCategory::Authorization,
            Self::AttachmentMissing | Self::ContentRequired | Self::Validation(_) => {
                ErrorCategory::Validation
            }
            Self::ConversationNotFound => ErrorCategory::NotFound,
            Self::Unavailable { .. } => ErrorCategory::Transient,
        }
    }

    /// HTTP status code when the error ends an upgrade request
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Auth => 401,
            ErrorCategory::Authorization => 403,
            ErrorCategory::Validation => 400,
            ErrorCategory::NotFound => 404,
            ErrorCategory::Transient => 503,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::AttachmentMissing(_) => Self::AttachmentMissing,
            DomainError::ContentRequired => Self::ContentRequired,
            DomainError::ConversationNotFound(_) => Self::ConversationNotFound,
            DomainError::NotAParticipant { .. } => Self::NotAParticipant,
            DomainError::ValidationError(msg) => Self::Validation(msg),
            other => Self::unavailable("complete request", other),
        }
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::MissingAuth => Self::AuthMissing,
            other if other.is_auth() => Self::AuthFailure(other.to_string()),
            other => Self::unavailable("complete request", other),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

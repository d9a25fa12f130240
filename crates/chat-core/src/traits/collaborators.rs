//! Collaborator traits (ports) - the two external services the messaging core
//! calls into
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation (PostgreSQL or in-memory, see `chat-db`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{Conversation, Message, NewMessage, Profile};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for collaborator operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Directory
// ============================================================================

/// Identity and membership lookups
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve a user identity to its profile
    async fn resolve_user(&self, user_id: Snowflake) -> RepoResult<Option<Profile>>;

    /// Find a conversation with its participant set
    async fn find_conversation(&self, conversation_id: Snowflake)
        -> RepoResult<Option<Conversation>>;

    /// Check conversation membership. Unknown conversations have no participants.
    async fn is_participant(&self, conversation_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        Ok(self
            .find_conversation(conversation_id)
            .await?
            .is_some_and(|c| c.is_participant(user_id)))
    }
}

// ============================================================================
// Store
// ============================================================================

/// What a read receipt is appended to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadTarget {
    /// A single message
    Message(Snowflake),
    /// Every message of a conversation not yet read by the user
    Conversation(Snowflake),
}

/// Durable message persistence
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a message, assigning its canonical id and timestamp. The sender
    /// is recorded in the read-receipt set.
    async fn create_message(&self, draft: NewMessage) -> RepoResult<Message>;

    /// Update a conversation's latest-message pointer
    async fn set_latest_message(&self, conversation_id: Snowflake, message_id: Snowflake) -> RepoResult<()>;

    /// Append a read receipt; returns how many messages gained a receipt
    async fn append_read_receipt(
        &self,
        target: ReadTarget,
        user_id: Snowflake,
        at: DateTime<Utc>,
    ) -> RepoResult<u64>;
}

//! Broadcast group keys

use chat_core::Snowflake;
use std::fmt;

/// A named set of connections that receives the same fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    /// Every connection of one user, joined automatically at connect
    Personal(Snowflake),
    /// Connections that joined a conversation explicitly
    Conversation(Snowflake),
}

impl GroupKey {
    #[must_use]
    pub const fn is_personal(self) -> bool {
        matches!(self, Self::Personal(_))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Personal(user_id) => write!(f, "user:{user_id}"),
            Self::Conversation(conversation_id) => write!(f, "conversation:{conversation_id}"),
        }
    }
}

//! Profile entity - the identity a connection authenticates as

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Public profile resolved by the directory at authentication time.
///
/// The messaging core never mutates it; a connection keeps the copy it was
/// handed for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Snowflake,
    pub username: String,
    pub avatar: Option<String>,
}

impl Profile {
    pub fn new(id: Snowflake, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            avatar: None,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

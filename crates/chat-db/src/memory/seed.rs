//! Seed data for the in-memory backend, loadable from JSON

use std::path::Path;

use serde::Deserialize;

use chat_core::{Conversation, DomainError, Profile, Snowflake};

/// Users and conversations to preload
///
/// ```json
/// {
///   "users": [{ "id": "1", "username": "alice" }],
///   "conversations": [{ "id": "100", "participants": ["1", "2"] }]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub users: Vec<Profile>,
    #[serde(default)]
    pub conversations: Vec<SeedConversation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedConversation {
    pub id: Snowflake,
    #[serde(default)]
    pub name: Option<String>,
    pub participants: Vec<Snowflake>,
}

impl SeedConversation {
    pub fn into_conversation(self) -> Conversation {
        match (self.name, self.participants.as_slice()) {
            (None, [a, b]) => Conversation::direct(self.id, *a, *b),
            (name, _) => Conversation::group(
                self.id,
                name.unwrap_or_default(),
                self.participants,
            ),
        }
    }
}

impl Seed {
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        serde_json::from_str(json)
            .map_err(|e| DomainError::ValidationError(format!("invalid seed: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DomainError::InternalError(format!("cannot read seed {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

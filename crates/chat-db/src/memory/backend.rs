//! Process-local tables implementing both collaborator traits

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, instrument};

use chat_core::{
    Conversation, Directory, DomainError, Message, NewMessage, Profile, ReadTarget, RepoResult,
    Snowflake, SnowflakeGenerator, Store,
};

use super::seed::{Seed, SeedConversation};

#[derive(Default)]
struct Tables {
    users: HashMap<Snowflake, Profile>,
    conversations: HashMap<Snowflake, Conversation>,
    // keyed by id, which orders by creation
    messages: BTreeMap<Snowflake, Message>,
}

/// Directory and Store over in-process tables.
///
/// [`MemoryBackend::set_unavailable`] makes every trait call fail with a
/// database error, for exercising transient-failure paths.
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    ids: SnowflakeGenerator,
    unavailable: AtomicBool,
}

impl MemoryBackend {
    pub fn new(worker_id: u16) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            ids: SnowflakeGenerator::new(worker_id),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn from_seed(worker_id: u16, seed: Seed) -> Self {
        let backend = Self::new(worker_id);
        for user in seed.users {
            backend.insert_user(user);
        }
        for conversation in seed.conversations {
            backend.insert_conversation(SeedConversation::into_conversation(conversation));
        }
        backend
    }

    pub fn insert_user(&self, profile: Profile) {
        self.tables.write().users.insert(profile.id, profile);
    }

    pub fn insert_conversation(&self, conversation: Conversation) {
        self.tables
            .write()
            .conversations
            .insert(conversation.id, conversation);
    }

    pub fn conversation(&self, id: Snowflake) -> Option<Conversation> {
        self.tables.read().conversations.get(&id).cloned()
    }

    pub fn message(&self, id: Snowflake) -> Option<Message> {
        self.tables.read().messages.get(&id).cloned()
    }

    /// Messages of one conversation in creation order
    pub fn messages_in(&self, conversation_id: Snowflake) -> Vec<Message> {
        self.tables
            .read()
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect()
    }

    pub fn message_count(&self) -> usize {
        self.tables.read().messages.len()
    }

    pub fn user_ids(&self) -> Vec<Snowflake> {
        let mut ids: Vec<_> = self.tables.read().users.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> RepoResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("backend unavailable".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl Directory for MemoryBackend {
    async fn resolve_user(&self, user_id: Snowflake) -> RepoResult<Option<Profile>> {
        self.check_available()?;
        Ok(self.tables.read().users.get(&user_id).cloned())
    }

    async fn find_conversation(&self, conversation_id: Snowflake) -> RepoResult<Option<Conversation>> {
        self.check_available()?;
        Ok(self.conversation(conversation_id))
    }
}

#[async_trait]
impl Store for MemoryBackend {
    #[instrument(skip(self, draft), fields(conversation_id = %draft.conversation_id))]
    async fn create_message(&self, draft: NewMessage) -> RepoResult<Message> {
        self.check_available()?;
        let mut tables = self.tables.write();
        if !tables.conversations.contains_key(&draft.conversation_id) {
            return Err(DomainError::ConversationNotFound(draft.conversation_id));
        }

        let message = Message::from_draft(self.ids.generate(), draft, Utc::now());
        tables.messages.insert(message.id, message.clone());
        debug!(message_id = %message.id, "message persisted");
        Ok(message)
    }

    async fn set_latest_message(&self, conversation_id: Snowflake, message_id: Snowflake) -> RepoResult<()> {
        self.check_available()?;
        self.tables
            .write()
            .conversations
            .get_mut(&conversation_id)
            .map(|c| c.set_latest_message(message_id))
            .ok_or(DomainError::ConversationNotFound(conversation_id))
    }

    async fn append_read_receipt(
        &self,
        target: ReadTarget,
        user_id: Snowflake,
        at: DateTime<Utc>,
    ) -> RepoResult<u64> {
        self.check_available()?;
        let mut tables = self.tables.write();
        let added = match target {
            ReadTarget::Message(message_id) => tables
                .messages
                .get_mut(&message_id)
                .map_or(0, |m| u64::from(m.mark_read(user_id, at))),
            ReadTarget::Conversation(conversation_id) => tables
                .messages
                .values_mut()
                .filter(|m| m.conversation_id == conversation_id)
                .map(|m| u64::from(m.mark_read(user_id, at)))
                .sum(),
        };
        Ok(added)
    }
}

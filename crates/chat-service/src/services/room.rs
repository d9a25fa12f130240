//! Room membership checks
//!
//! Joining a conversation's broadcast group is allowed only for its
//! participants. Leaving needs no check and never touches the directory.

use chat_core::{Conversation, Snowflake};
use tracing::{debug, instrument, warn};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

pub struct RoomService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RoomService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Check that `user_id` may receive the conversation's broadcasts
    #[instrument(skip(self))]
    pub async fn authorize_join(
        &self,
        user_id: Snowflake,
        conversation_id: Snowflake,
    ) -> ServiceResult<Conversation> {
        let conversation = self
            .ctx
            .directory()
            .find_conversation(conversation_id)
            .await
            .map_err(|e| ServiceError::unavailable("join chat", e))?
            .ok_or(ServiceError::ConversationNotFound)?;

        if !conversation.is_participant(user_id) {
            warn!("join refused: not a participant");
            return Err(ServiceError::NotAParticipant);
        }

        debug!("join authorized");
        Ok(conversation)
    }
}

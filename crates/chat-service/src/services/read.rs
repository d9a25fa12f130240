//! Read receipts

use chat_core::{ReadTarget, Snowflake};
use chrono::Utc;
use tracing::{debug, instrument};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

const MARK_READ: &str = "mark messages as read";

pub struct ReadService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReadService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Record that `user_id` has read every message in the conversation.
    /// Returns the number of receipts added; already-read messages are skipped.
    #[instrument(skip(self))]
    pub async fn mark_conversation_read(
        &self,
        user_id: Snowflake,
        conversation_id: Snowflake,
    ) -> ServiceResult<u64> {
        self.require_participant(user_id, conversation_id).await?;

        let added = self
            .ctx
            .store()
            .append_read_receipt(ReadTarget::Conversation(conversation_id), user_id, Utc::now())
            .await
            .map_err(|e| ServiceError::unavailable(MARK_READ, e))?;

        debug!(added, "conversation marked read");
        Ok(added)
    }

    /// Record a receipt for one message of a conversation
    #[instrument(skip(self))]
    pub async fn mark_message_read(
        &self,
        user_id: Snowflake,
        conversation_id: Snowflake,
        message_id: Snowflake,
    ) -> ServiceResult<bool> {
        self.require_participant(user_id, conversation_id).await?;

        let added = self
            .ctx
            .store()
            .append_read_receipt(ReadTarget::Message(message_id), user_id, Utc::now())
            .await
            .map_err(|e| ServiceError::unavailable(MARK_READ, e))?;
        Ok(added > 0)
    }

    async fn require_participant(
        &self,
        user_id: Snowflake,
        conversation_id: Snowflake,
    ) -> ServiceResult<()> {
        let allowed = self
            .ctx
            .directory()
            .is_participant(conversation_id, user_id)
            .await
            .map_err(|e| ServiceError::unavailable(MARK_READ, e))?;
        if allowed {
            Ok(())
        } else {
            Err(ServiceError::NotAuthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::SendMessageRequest;
    use crate::services::test_support::{context, profile, ALICE, BOB, CAROL, CONV};
    use crate::services::MessageService;

    #[tokio::test]
    async fn test_mark_conversation_read() {
        let (ctx, backend) = context();
        let sender = MessageService::new(&ctx);
        for body in ["one", "two"] {
            sender
                .send(&profile(ALICE), SendMessageRequest::text(CONV, body))
                .await
                .unwrap();
        }

        let reads = ReadService::new(&ctx);
        assert_eq!(reads.mark_conversation_read(BOB, CONV).await.unwrap(), 2);
        assert_eq!(reads.mark_conversation_read(BOB, CONV).await.unwrap(), 0);
        assert!(backend.messages_in(CONV).iter().all(|m| m.is_read_by(BOB)));
    }

    #[tokio::test]
    async fn test_mark_single_message() {
        let (ctx, _) = context();
        let delivered = MessageService::new(&ctx)
            .send(&profile(BOB), SendMessageRequest::text(CONV, "ping"))
            .await
            .unwrap();

        let reads = ReadService::new(&ctx);
        assert!(reads
            .mark_message_read(ALICE, CONV, delivered.message.id)
            .await
            .unwrap());
        // the sender's own receipt already exists
        assert!(!reads
            .mark_message_read(BOB, CONV, delivered.message.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_outsider_cannot_mark_read() {
        let (ctx, _) = context();
        assert!(matches!(
            ReadService::new(&ctx).mark_conversation_read(CAROL, CONV).await,
            Err(ServiceError::NotAuthorized)
        ));
    }
}

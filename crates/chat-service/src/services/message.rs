//! Message send
//!
//! A send is checked in a fixed order (sender participates, attachment
//! present for non-text kinds, text present for text) and then persisted
//! before anything is delivered. The caller fans out the returned
//! [`DeliveredMessage`] only after this returns `Ok`.

use chat_core::{Conversation, Message, NewMessage, Profile};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::dto::{MessageResponse, SendMessageRequest};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

const SEND: &str = "send message";

/// A persisted message with everything fan-out needs
#[derive(Debug, Clone)]
pub struct DeliveredMessage {
    pub message: Message,
    /// Conversation as of this send, latest pointer included
    pub conversation: Conversation,
    pub sender: Profile,
}

impl DeliveredMessage {
    pub fn response(&self) -> MessageResponse {
        MessageResponse::new(&self.message, &self.sender)
    }
}

pub struct MessageService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Validate, persist and move the conversation's latest pointer
    #[instrument(skip(self, sender, request), fields(sender_id = %sender.id, conversation_id = %request.conversation_id))]
    pub async fn send(
        &self,
        sender: &Profile,
        request: SendMessageRequest,
    ) -> ServiceResult<DeliveredMessage> {
        let mut conversation = self
            .ctx
            .directory()
            .find_conversation(request.conversation_id)
            .await
            .map_err(|e| ServiceError::unavailable(SEND, e))?
            .filter(|c| c.is_participant(sender.id))
            .ok_or(ServiceError::NotAuthorized)?;

        let content = request.to_content()?;
        request
            .validate()
            .map_err(|e| ServiceError::validation(first_validation_message(&e)))?;

        let message = self
            .ctx
            .store()
            .create_message(NewMessage {
                conversation_id: conversation.id,
                sender_id: sender.id,
                content,
            })
            .await
            .map_err(|e| ServiceError::unavailable(SEND, e))?;

        if let Err(e) = self
            .ctx
            .store()
            .set_latest_message(conversation.id, message.id)
            .await
        {
            warn!(message_id = %message.id, error = %e, "message stored but latest pointer not updated");
            return Err(ServiceError::unavailable(SEND, e));
        }
        conversation.set_latest_message(message.id);

        info!(message_id = %message.id, kind = %message.kind(), "message sent");
        Ok(DeliveredMessage {
            message,
            conversation,
            sender: sender.clone(),
        })
    }
}

fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(ToString::to_string))
        .unwrap_or_else(|| "Invalid message".to_string())
}

//! Conversation join (op 2) and leave (op 4)

use super::{acknowledge, HandlerResult};
use crate::connection::{Connection, GroupKey};
use crate::protocol::CloseCode;
use crate::server::GatewayState;
use chat_service::dto::ConversationRequest;
use chat_service::RoomService;
use std::sync::Arc;

pub struct RoomHandler;

impl RoomHandler {
    /// Add the connection to the conversation group if its user participates
    pub async fn join(
        state: &GatewayState,
        connection: &Arc<Connection>,
        nonce: Option<u64>,
        request: ConversationRequest,
    ) -> HandlerResult<Option<CloseCode>> {
        let result = RoomService::new(state.service_context())
            .authorize_join(connection.user_id(), request.conversation_id)
            .await
            .map(|conversation| {
                let key = GroupKey::Conversation(conversation.id);
                if state.connection_manager().join_group(connection, key) {
                    tracing::debug!(
                        session_id = %connection.session_id(),
                        conversation_id = %conversation.id,
                        "Joined conversation"
                    );
                }
            });

        if let Err(e) = &result {
            tracing::debug!(
                session_id = %connection.session_id(),
                conversation_id = %request.conversation_id,
                error = %e,
                "Join refused"
            );
        }

        acknowledge(connection, nonce, result).await
    }

    /// Leave a conversation group; always succeeds
    pub async fn leave(
        state: &GatewayState,
        connection: &Arc<Connection>,
        nonce: Option<u64>,
        request: ConversationRequest,
    ) -> HandlerResult<Option<CloseCode>> {
        state
            .connection_manager()
            .leave_group(connection, GroupKey::Conversation(request.conversation_id));
        acknowledge(connection, nonce, Ok(())).await
    }
}

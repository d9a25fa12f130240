//! Mark read handler (op 6)

use super::{acknowledge, HandlerResult};
use crate::connection::Connection;
use crate::protocol::CloseCode;
use crate::server::GatewayState;
use chat_service::dto::ConversationRequest;
use chat_service::ReadService;
use std::sync::Arc;

pub struct ReadHandler;

impl ReadHandler {
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        nonce: Option<u64>,
        request: ConversationRequest,
    ) -> HandlerResult<Option<CloseCode>> {
        let result = ReadService::new(state.service_context())
            .mark_conversation_read(connection.user_id(), request.conversation_id)
            .await
            .map(|added| {
                tracing::trace!(
                    session_id = %connection.session_id(),
                    conversation_id = %request.conversation_id,
                    added,
                    "Read receipts appended"
                );
            });
        acknowledge(connection, nonce, result).await
    }
}

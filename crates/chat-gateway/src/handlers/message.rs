//! Send message handler (op 5)
//!
//! Persistence completes inside `MessageService::send` before the fan-out
//! below starts, so no receiver can observe a message the store has not
//! accepted. The sender's ack goes out after the fan-out has been queued.
//!
//! The whole pipeline runs in its own task. Tearing down the sender's socket
//! aborts the receive loop awaiting it, but a message that reached the store
//! is still given its latest pointer and delivered to every live participant.

use super::{acknowledge, HandlerError, HandlerResult};
use crate::broadcast::{conversation_audience, deliver};
use crate::connection::Connection;
use crate::events::GatewayEventType;
use crate::protocol::CloseCode;
use crate::server::GatewayState;
use chat_service::dto::SendMessageRequest;
use chat_service::MessageService;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct MessageHandler;

impl MessageHandler {
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        nonce: Option<u64>,
        request: SendMessageRequest,
    ) -> HandlerResult<Option<CloseCode>> {
        let state = state.clone();
        let connection = connection.clone();
        let pipeline =
            tokio::spawn(async move { Self::send(&state, &connection, nonce, request).await });

        pipeline
            .await
            .map_err(|e| HandlerError::Internal(format!("send task failed: {e}")))?
    }

    async fn send(
        state: &GatewayState,
        connection: &Arc<Connection>,
        nonce: Option<u64>,
        request: SendMessageRequest,
    ) -> HandlerResult<Option<CloseCode>> {
        let conversation_id = request.conversation_id;
        let result = match MessageService::new(state.service_context())
            .send(connection.user(), request)
            .await
        {
            Ok(delivered) => {
                let data = serde_json::to_value(delivered.response()).map_err(|e| {
                    HandlerError::Internal(format!("encode MESSAGE_DELIVERED: {e}"))
                })?;
                let audience =
                    conversation_audience(state.connection_manager(), &delivered.conversation);
                let report = deliver(&audience, GatewayEventType::MessageDelivered, &data);

                info!(
                    message_id = %delivered.message.id,
                    conversation_id = %conversation_id,
                    delivered = report.delivered,
                    evicted = report.evicted,
                    "Message fanned out"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    session_id = %connection.session_id(),
                    conversation_id = %conversation_id,
                    code = e.code(),
                    error = %e,
                    "Send rejected"
                );
                Err(e)
            }
        };

        if connection.is_closed() {
            debug!(
                session_id = %connection.session_id(),
                conversation_id = %conversation_id,
                "Sender gone before ack"
            );
            return Ok(None);
        }
        acknowledge(connection, nonce, result).await
    }
}

//! Op code handlers
//!
//! Handles incoming WebSocket messages based on their operation code.

mod error;
mod heartbeat;
mod message;
mod presence;
mod read;
mod rooms;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use message::MessageHandler;
pub use presence::PresenceHandler;
pub use read::ReadHandler;
pub use rooms::RoomHandler;

use crate::connection::Connection;
use crate::protocol::{AckError, CloseCode, GatewayMessage, OpCode};
use crate::server::GatewayState;
use chat_service::ServiceError;
use std::sync::Arc;

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle an incoming client message
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        if !message.op.is_client_op() {
            tracing::warn!(
                session_id = %connection.session_id(),
                op = %message.op,
                "Received server-only op code from client"
            );
            return Ok(Some(CloseCode::UnknownOpcode));
        }

        let nonce = message.n;
        let decode_error = |e: serde_json::Error| HandlerError::invalid_payload(message.op.name(), &e);

        match message.op {
            OpCode::Heartbeat => {
                let seq = message.as_heartbeat_seq().flatten();
                HeartbeatHandler::handle(connection, seq).await
            }
            OpCode::PresenceUpdate => {
                let payload = message.payload().map_err(decode_error)?;
                PresenceHandler::handle(state, connection, payload).await
            }
            OpCode::JoinConversation => {
                let request = message.payload().map_err(decode_error)?;
                RoomHandler::join(state, connection, nonce, request).await
            }
            OpCode::LeaveConversation => {
                let request = message.payload().map_err(decode_error)?;
                RoomHandler::leave(state, connection, nonce, request).await
            }
            OpCode::SendMessage => {
                let request = message.payload().map_err(decode_error)?;
                MessageHandler::handle(state, connection, nonce, request).await
            }
            OpCode::MarkRead => {
                let request = message.payload().map_err(decode_error)?;
                ReadHandler::handle(state, connection, nonce, request).await
            }
            // These ops should never reach here due to is_client_op check
            OpCode::Dispatch | OpCode::Hello | OpCode::HeartbeatAck | OpCode::Ack => {
                tracing::error!(op = %message.op, "Unhandled client op code");
                Ok(Some(CloseCode::UnknownOpcode))
            }
        }
    }
}

/// Answer a request with an Ack when the client supplied a nonce
pub(crate) async fn acknowledge(
    connection: &Connection,
    nonce: Option<u64>,
    result: Result<(), ServiceError>,
) -> HandlerResult<Option<CloseCode>> {
    let Some(nonce) = nonce else {
        return Ok(None);
    };
    let error = result.as_ref().err().map(AckError::from);
    connection.send(GatewayMessage::ack(nonce, error)).await?;
    Ok(None)
}

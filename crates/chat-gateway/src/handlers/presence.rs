//! Presence update handler (op 3)

use super::HandlerResult;
use crate::connection::Connection;
use crate::presence::PresenceTransition;
use crate::protocol::{CloseCode, PresenceStatus, PresenceUpdatePayload};
use crate::server::GatewayState;
use std::sync::Arc;

pub struct PresenceHandler;

impl PresenceHandler {
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: PresenceUpdatePayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let registry = state.presence();
        let transition = match payload.status {
            PresenceStatus::Online => registry.declare_online(connection, payload.user_id),
            PresenceStatus::Offline => registry.declare_offline(connection, payload.user_id),
        };

        if transition != PresenceTransition::Ignored {
            tracing::debug!(
                session_id = %connection.session_id(),
                user_id = %connection.user_id(),
                status = ?payload.status,
                ?transition,
                "Presence declared"
            );
        }

        Ok(None)
    }
}

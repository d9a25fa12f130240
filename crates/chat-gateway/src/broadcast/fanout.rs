//! Non-blocking fan-out
//!
//! Each target gets the event through [`Connection::dispatch`]. A connection
//! whose queue is full is evicted as a slow consumer; one whose queue is
//! already closed is skipped. Neither delays delivery to the others.

use crate::connection::{Connection, ConnectionManager, DeliveryError, GroupKey};
use crate::events::GatewayEventType;
use crate::protocol::CloseCode;
use chat_core::Conversation;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome counts of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub evicted: usize,
    pub skipped: usize,
}

/// Deliver one event to every connection in `targets`
pub fn deliver<'a, I>(targets: I, event: GatewayEventType, data: &Value) -> FanoutReport
where
    I: IntoIterator<Item = &'a Arc<Connection>>,
{
    let mut report = FanoutReport::default();

    for connection in targets {
        match connection.dispatch(event, data.clone()) {
            Ok(_) => report.delivered += 1,
            Err(DeliveryError::Full) => {
                tracing::warn!(
                    session_id = %connection.session_id(),
                    user_id = %connection.user_id(),
                    event = %event,
                    "Outbound queue full, evicting slow consumer"
                );
                connection.evict(CloseCode::SlowConsumer);
                report.evicted += 1;
            }
            Err(DeliveryError::Closed) => report.skipped += 1,
        }
    }

    report
}

/// Connections that should see a message of `conversation`: the conversation
/// group plus every participant's personal group, each connection once.
pub fn conversation_audience(
    manager: &ConnectionManager,
    conversation: &Conversation,
) -> Vec<Arc<Connection>> {
    let mut seen = HashSet::new();
    std::iter::once(GroupKey::Conversation(conversation.id))
        .chain(conversation.participants.iter().copied().map(GroupKey::Personal))
        .flat_map(|key| manager.group_members(key))
        .filter(|connection| seen.insert(connection.session_id().to_string()))
        .collect()
}

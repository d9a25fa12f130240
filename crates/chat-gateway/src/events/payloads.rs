//! Dispatch payloads
//!
//! `MESSAGE_DELIVERED` carries a [`MessageResponse`](chat_service::dto::MessageResponse)
//! unchanged; the other events are defined here.

use chat_core::Snowflake;
use chat_service::dto::UserResponse;
use serde::{Deserialize, Serialize};

/// Gateway protocol version reported in READY
pub const GATEWAY_VERSION: u8 = 1;

/// READY event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyEvent {
    pub v: u8,
    pub user: UserResponse,
    pub session_id: String,
}

impl ReadyEvent {
    #[must_use]
    pub fn new(user: UserResponse, session_id: impl Into<String>) -> Self {
        Self {
            v: GATEWAY_VERSION,
            user,
            session_id: session_id.into(),
        }
    }
}

/// PRESENCE_SNAPSHOT event payload, ids sorted ascending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshotEvent {
    pub online_users: Vec<Snowflake>,
}

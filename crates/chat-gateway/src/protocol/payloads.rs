//! Payloads of the non-dispatch ops

use chat_core::Snowflake;
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Default heartbeat interval (45 seconds)
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 45_000;

    #[must_use]
    pub fn new() -> Self {
        Self {
            heartbeat_interval: Self::DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

impl Default for HelloPayload {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// Payload for op 3 (Presence Update)
///
/// `user_id` is optional; when present it must name the connection's own
/// identity or the declaration is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdatePayload {
    pub status: PresenceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Snowflake>,
}

impl PresenceUpdatePayload {
    #[must_use]
    pub fn online() -> Self {
        Self {
            status: PresenceStatus::Online,
            user_id: None,
        }
    }

    #[must_use]
    pub fn offline() -> Self {
        Self {
            status: PresenceStatus::Offline,
            user_id: None,
        }
    }
}

/// `d` of a failed op 12 (Ack); a successful ack carries no payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckError {
    pub error: String,
    pub code: String,
}

impl From<&chat_service::ServiceError> for AckError {
    fn from(err: &chat_service::ServiceError) -> Self {
        Self {
            error: err.client_message(),
            code: err.code().to_string(),
        }
    }
}

//! Gateway event types
//!
//! Names sent in the `t` field of dispatch messages.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEventType {
    /// First dispatch of every connection: own profile and session id
    Ready,
    /// Full set of online users, sent after every presence change
    PresenceSnapshot,
    /// A persisted message, fanned out to the conversation and its participants
    MessageDelivered,
}

impl GatewayEventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::PresenceSnapshot => "PRESENCE_SNAPSHOT",
            Self::MessageDelivered => "MESSAGE_DELIVERED",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "READY" => Some(Self::Ready),
            "PRESENCE_SNAPSHOT" => Some(Self::PresenceSnapshot),
            "MESSAGE_DELIVERED" => Some(Self::MessageDelivered),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

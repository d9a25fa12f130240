//! Gateway operation codes

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Gateway operation codes
///
/// Op codes define the type of message being sent or received over the WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Server dispatches an event to the client (server only)
    Dispatch = 0,
    /// Heartbeat - keep connection alive (client)
    Heartbeat = 1,
    /// Join a conversation's broadcast group (client only)
    JoinConversation = 2,
    /// Declare online/offline (client only)
    PresenceUpdate = 3,
    /// Leave a conversation's broadcast group (client only)
    LeaveConversation = 4,
    /// Send a message (client only)
    SendMessage = 5,
    /// Mark a conversation read (client only)
    MarkRead = 6,
    /// Hello - sent on connect (server only)
    Hello = 10,
    /// Heartbeat ACK - heartbeat acknowledged (server only)
    HeartbeatAck = 11,
    /// Result of a client request carrying a nonce (server only)
    Ack = 12,
}

impl OpCode {
    /// Create an `OpCode` from a raw integer value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::JoinConversation),
            3 => Some(Self::PresenceUpdate),
            4 => Some(Self::LeaveConversation),
            5 => Some(Self::SendMessage),
            6 => Some(Self::MarkRead),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            12 => Some(Self::Ack),
            _ => None,
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this op code can be sent by the client
    #[must_use]
    pub const fn is_client_op(self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::JoinConversation
                | Self::PresenceUpdate
                | Self::LeaveConversation
                | Self::SendMessage
                | Self::MarkRead
        )
    }

    /// Check if this op code can be sent by the server
    #[must_use]
    pub const fn is_server_op(self) -> bool {
        matches!(
            self,
            Self::Dispatch | Self::Hello | Self::HeartbeatAck | Self::Ack
        )
    }

    /// Client requests that are answered with an [`OpCode::Ack`] when they carry a nonce
    #[must_use]
    pub const fn is_acknowledged(self) -> bool {
        matches!(
            self,
            Self::JoinConversation | Self::LeaveConversation | Self::SendMessage | Self::MarkRead
        )
    }

    /// Get the name of this op code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dispatch => "Dispatch",
            Self::Heartbeat => "Heartbeat",
            Self::JoinConversation => "JoinConversation",
            Self::PresenceUpdate => "PresenceUpdate",
            Self::LeaveConversation => "LeaveConversation",
            Self::SendMessage => "SendMessage",
            Self::MarkRead => "MarkRead",
            Self::Hello => "Hello",
            Self::HeartbeatAck => "HeartbeatAck",
            Self::Ack => "Ack",
        }
    }
}

impl Serialize for OpCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value).ok_or_else(|| serde::de::Error::custom(format!("invalid op code: {value}")))
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_from_u8() {
        assert_eq!(OpCode::from_u8(0), Some(OpCode::Dispatch));
        assert_eq!(OpCode::from_u8(2), Some(OpCode::JoinConversation));
        assert_eq!(OpCode::from_u8(5), Some(OpCode::SendMessage));
        assert_eq!(OpCode::from_u8(6), Some(OpCode::MarkRead));
        assert_eq!(OpCode::from_u8(12), Some(OpCode::Ack));
        assert_eq!(OpCode::from_u8(7), None);
        assert_eq!(OpCode::from_u8(255), None);
    }

    #[test]
    fn test_client_and_server_ops_are_disjoint() {
        for raw in 0..=u8::MAX {
            if let Some(op) = OpCode::from_u8(raw) {
                assert_eq!(op.as_u8(), raw);
                assert!(
                    op.is_client_op() != op.is_server_op(),
                    "{op} must belong to exactly one side"
                );
            }
        }
    }

    #[test]
    fn test_acknowledged_ops() {
        assert!(OpCode::SendMessage.is_acknowledged());
        assert!(OpCode::JoinConversation.is_acknowledged());
        assert!(!OpCode::Heartbeat.is_acknowledged());
        assert!(!OpCode::PresenceUpdate.is_acknowledged());
    }

    #[test]
    fn test_opcode_serialization() {
        assert_eq!(serde_json::to_string(&OpCode::Hello).unwrap(), "10");
        let op: OpCode = serde_json::from_str("5").unwrap();
        assert_eq!(op, OpCode::SendMessage);
        assert!(serde_json::from_str::<OpCode>("9").is_err());
    }

    #[test]
    fn test_opcode_display() {
        assert_eq!(format!("{}", OpCode::Ack), "Ack (12)");
    }
}

//! WebSocket close codes
//!
//! Gateway-specific codes sent when the server ends a connection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error occurred
    UnknownError = 4000,
    /// Unknown or server-only opcode sent
    UnknownOpcode = 4001,
    /// Frame or payload failed to decode
    DecodeError = 4002,
    /// Outbound queue overflowed; the client stopped reading
    SlowConsumer = 4008,
    /// No heartbeat within the timeout
    SessionTimeout = 4009,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownOpcode),
            4002 => Some(Self::DecodeError),
            4008 => Some(Self::SlowConsumer),
            4009 => Some(Self::SessionTimeout),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Check if the client should attempt to reconnect after this close code
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        matches!(
            self,
            Self::UnknownError | Self::SlowConsumer | Self::SessionTimeout
        )
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::UnknownOpcode => "Invalid opcode sent",
            Self::DecodeError => "Invalid payload encoding",
            Self::SlowConsumer => "Outbound queue overflowed",
            Self::SessionTimeout => "Session timeout",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnknownError => "UnknownError",
            Self::UnknownOpcode => "UnknownOpcode",
            Self::DecodeError => "DecodeError",
            Self::SlowConsumer => "SlowConsumer",
            Self::SessionTimeout => "SessionTimeout",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_from_u16() {
        assert_eq!(CloseCode::from_u16(4002), Some(CloseCode::DecodeError));
        assert_eq!(CloseCode::from_u16(4008), Some(CloseCode::SlowConsumer));
        assert_eq!(CloseCode::from_u16(1000), None);
        assert_eq!(CloseCode::from_u16(4004), None);
    }

    #[test]
    fn test_should_reconnect() {
        assert!(CloseCode::SlowConsumer.should_reconnect());
        assert!(CloseCode::SessionTimeout.should_reconnect());
        // a client that sends garbage would only repeat it
        assert!(!CloseCode::DecodeError.should_reconnect());
        assert!(!CloseCode::UnknownOpcode.should_reconnect());
    }

    #[test]
    fn test_close_code_display() {
        let display = CloseCode::SessionTimeout.to_string();
        assert!(display.contains("4009"));
        assert!(display.contains("timeout"));
    }
}

//! Gateway message format
//!
//! Every frame in either direction is a JSON object `{ op, t?, s?, n?, d? }`.

use super::{AckError, CloseCode, HelloPayload, OpCode};
use crate::events::GatewayEventType;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Per-connection sequence number (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Request nonce chosen by the client, echoed by the matching Ack
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u64>,

    /// Event data payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

/// Why an inbound frame could not be turned into a [`GatewayMessage`]
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unknown op code: {0}")]
    UnknownOpcode(u64),
}

impl FrameError {
    #[must_use]
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::Decode(_) => CloseCode::DecodeError,
            Self::UnknownOpcode(_) => CloseCode::UnknownOpcode,
        }
    }
}

/// Frame with the op left raw so an unknown op is told apart from bad JSON
#[derive(Deserialize)]
struct RawFrame {
    op: u64,
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    n: Option<u64>,
    #[serde(default)]
    d: Option<Value>,
}

impl GatewayMessage {
    fn new(op: OpCode) -> Self {
        Self {
            op,
            t: None,
            s: None,
            n: None,
            d: None,
        }
    }

    // === Server Messages ===

    /// Create a Dispatch message (op=0)
    #[must_use]
    pub fn dispatch(event_type: GatewayEventType, sequence: u64, data: Value) -> Self {
        Self {
            t: Some(event_type.as_str().to_string()),
            s: Some(sequence),
            d: Some(data),
            ..Self::new(OpCode::Dispatch)
        }
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self {
            d: Some(serde_json::to_value(payload).unwrap_or_default()),
            ..Self::new(OpCode::Hello)
        }
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::new(OpCode::HeartbeatAck)
    }

    /// Create an Ack (op=12) answering the request with `nonce`
    #[must_use]
    pub fn ack(nonce: u64, error: Option<AckError>) -> Self {
        Self {
            n: Some(nonce),
            d: error.and_then(|e| serde_json::to_value(e).ok()),
            ..Self::new(OpCode::Ack)
        }
    }

    // === Client Messages ===

    /// Create a Heartbeat message (op=1)
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self {
            d: last_sequence.map(|s| Value::Number(s.into())),
            ..Self::new(OpCode::Heartbeat)
        }
    }

    /// Create a client request carrying `payload`
    pub fn request<T: Serialize>(
        op: OpCode,
        nonce: Option<u64>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            n: nonce,
            d: Some(serde_json::to_value(payload)?),
            ..Self::new(op)
        })
    }

    // === Parsing ===

    /// Decode `d` into the payload type of this op
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.d.clone().unwrap_or(Value::Null))
    }

    /// The client's last seen sequence number (op=1)
    pub fn as_heartbeat_seq(&self) -> Option<Option<u64>> {
        if self.op != OpCode::Heartbeat {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_u64))
    }

    /// The error of a failed Ack, `None` for success or any other op
    pub fn ack_error(&self) -> Option<AckError> {
        if self.op != OpCode::Ack {
            return None;
        }
        self.d
            .as_ref()
            .filter(|d| !d.is_null())
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Event type of a Dispatch
    pub fn event_type(&self) -> Option<GatewayEventType> {
        self.t.as_deref().and_then(GatewayEventType::from_name)
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, FrameError> {
        let raw: RawFrame = serde_json::from_str(json)?;
        let op = u8::try_from(raw.op)
            .ok()
            .and_then(OpCode::from_u8)
            .ok_or(FrameError::UnknownOpcode(raw.op))?;
        Ok(Self {
            op,
            t: raw.t,
            s: raw.s,
            n: raw.n,
            d: raw.d,
        })
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GatewayMessage(op={}", self.op)?;
        if let Some(t) = &self.t {
            write!(f, ", t={t}")?;
        }
        if let Some(s) = self.s {
            write!(f, ", s={s}")?;
        }
        if let Some(n) = self.n {
            write!(f, ", n={n}")?;
        }
        write!(f, ")")
    }
}

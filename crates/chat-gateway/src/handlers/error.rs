//! Handler error types
//!
//! Only protocol failures surface here; request failures are acknowledged
//! to the client and never become a `HandlerError`.

use crate::connection::DeliveryError;
use crate::protocol::CloseCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    /// Payload did not match the op's schema
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A reply could not be queued
    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn invalid_payload(op: &str, err: &serde_json::Error) -> Self {
        Self::InvalidPayload(format!("{op}: {err}"))
    }

    /// Convert to a close code (if applicable)
    pub fn to_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::InvalidPayload(_) => Some(CloseCode::DecodeError),
            Self::Delivery(_) | Self::Internal(_) => Some(CloseCode::UnknownError),
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;

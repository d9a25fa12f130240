//! Client error types

use chat_gateway::protocol::FrameError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Upgrade refused or transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("Invalid frame: {0}")]
    Frame(#[from] FrameError),

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The server did not open the session with Hello then READY
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Connection closed")]
    Closed,
}

impl ClientError {
    /// HTTP status of a refused upgrade
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::WebSocket(tungstenite::Error::Http(response)) => Some(response.status().as_u16()),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

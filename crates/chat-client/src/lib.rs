//! # chat-client
//!
//! Client side of the gateway protocol.
//!
//! - [`ChatState`]: local timelines with optimistic sends, reconciled
//!   against the server's deliveries, plus unread counters, previews and the
//!   online-user set
//! - [`GatewayClient`]: WebSocket connection with nonce-correlated
//!   acknowledgments and a bounded ack wait
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_client::{ChatState, ClientConfig, GatewayClient, ServerEvent};
//!
//! let mut client = GatewayClient::connect("ws://127.0.0.1:8081/gateway", &token, ClientConfig::default()).await?;
//! let mut state = ChatState::new(client.user().id);
//!
//! let request = SendMessageRequest::text(conversation_id, "hello");
//! let temp_id = state.begin_send(&request);
//! let outcome = client.send_message(&request).await?;
//! state.on_ack(temp_id, outcome);
//!
//! while let Some(ServerEvent::MessageDelivered(message)) = client.next_event().await {
//!     state.on_delivered(message);
//! }
//! ```

mod client;
mod error;
mod state;

pub use client::{AckOutcome, ClientConfig, GatewayClient, ServerEvent};
pub use error::{ClientError, ClientResult};
pub use state::{
    ChatState, ClientCommand, ClientEffect, MergeOutcome, OutboundStatus, PendingMessage,
    TempId, TimelineEntry,
};

//! # chat-gateway
//!
//! WebSocket transport for real-time chat: authenticated connections,
//! conversation groups, message fan-out and the presence registry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_gateway::{create_app, create_gateway_state};
//!
//! let state = create_gateway_state(config).await?;
//! let app = create_app(state);
//! ```

pub mod broadcast;
pub mod connection;
pub mod events;
pub mod handlers;
pub mod presence;
pub mod protocol;
pub mod server;

pub use server::{create_app, create_gateway_state, create_router, run, run_server, GatewayState};

//! Data transfer objects shared by the gateway and its clients
//!
//! - Request DTOs with validation for inbound operations
//! - Response DTOs for serializing server-pushed payloads
//! - Mappers for converting domain entities to DTOs

pub mod mappers;
pub mod requests;
pub mod responses;

pub use requests::{ConversationRequest, SendMessageRequest};
pub use responses::{MessageResponse, ReadReceiptResponse, UserResponse};

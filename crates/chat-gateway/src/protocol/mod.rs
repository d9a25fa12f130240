//! Gateway protocol definitions
//!
//! Op codes, the frame format, payloads of the non-dispatch ops, and close codes.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::{FrameError, GatewayMessage};
pub use opcodes::OpCode;
pub use payloads::{AckError, HelloPayload, PresenceStatus, PresenceUpdatePayload};

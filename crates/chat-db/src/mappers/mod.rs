//! Entity <-> Model mappers
//!
//! Convert between database rows and the domain types in chat-core.

mod conversation;
mod message;
mod user;

pub use message::MessageColumns;

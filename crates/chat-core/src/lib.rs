//! # chat-core
//!
//! Domain layer containing identities, conversations, messages and the two
//! collaborator traits the messaging core talks to: [`Directory`] for identity
//! and membership lookups, [`Store`] for durable message persistence.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    AttachmentRef, Conversation, Message, MessageContent, MessageKind, NewMessage, Profile,
    ReadReceipt,
};
pub use error::DomainError;
pub use traits::{Directory, ReadTarget, RepoResult, Store};
pub use value_objects::{Snowflake, SnowflakeGenerator, SnowflakeParseError};

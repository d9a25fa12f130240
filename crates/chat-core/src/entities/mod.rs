//! Domain entities - core business objects

mod conversation;
mod message;
mod user;

pub use conversation::Conversation;
pub use message::{AttachmentRef, Message, MessageContent, MessageKind, NewMessage, ReadReceipt};
pub use user::Profile;

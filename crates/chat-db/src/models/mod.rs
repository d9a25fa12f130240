//! Database models with SQLx `FromRow` derives

mod conversation;
mod message;
mod user;

pub use conversation::ConversationModel;
pub use message::{MessageModel, MessageReadModel};
pub use user::UserModel;

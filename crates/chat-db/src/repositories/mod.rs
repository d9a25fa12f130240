//! PostgreSQL implementations of the collaborator traits defined in chat-core

mod directory;
mod error;
mod store;

pub use directory::PgDirectory;
pub use store::PgStore;

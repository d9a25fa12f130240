//! In-memory Directory and Store
//!
//! Backs the gateway when no database is configured and every test suite in
//! the workspace.

mod backend;
mod seed;

pub use backend::MemoryBackend;
pub use seed::{Seed, SeedConversation};

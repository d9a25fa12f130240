//! Presence tracking

mod registry;

pub use registry::{PresenceRegistry, PresenceTransition};

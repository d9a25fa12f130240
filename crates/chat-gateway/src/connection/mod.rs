//! Connection management
//!
//! Live connections and the groups they broadcast through.

mod connection;
mod group;
mod manager;

pub use connection::{Connection, DeliveryError};
pub use group::GroupKey;
pub use manager::ConnectionManager;

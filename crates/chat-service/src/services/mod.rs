//! Business logic services
//!
//! Each service borrows the [`ServiceContext`] for the duration of one call.

pub mod auth;
pub mod context;
pub mod error;
pub mod message;
pub mod read;
pub mod room;

pub use auth::AuthService;
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ErrorCategory, ServiceError, ServiceResult};
pub use message::{DeliveredMessage, MessageService};
pub use read::ReadService;
pub use room::RoomService;

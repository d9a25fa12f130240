//! # chat-db
//!
//! Backends for the [`Directory`](chat_core::Directory) and
//! [`Store`](chat_core::Store) traits.
//!
//! - [`PgDirectory`] / [`PgStore`]: PostgreSQL via SQLx, runtime queries with
//!   `FromRow` models and model → entity mappers
//! - [`MemoryBackend`]: process-local tables behind a lock, used when no
//!   database is configured and throughout the test suites
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_db::{create_pool, ensure_schema, PgDirectory, PgStore, PoolConfig};
//!
//! async fn example() -> Result<(), sqlx::Error> {
//!     let pool = create_pool(&PoolConfig::default()).await?;
//!     ensure_schema(&pool).await?;
//!     let directory = PgDirectory::new(pool.clone());
//!     let store = PgStore::new(pool, 0);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::{MemoryBackend, Seed};
pub use pool::{create_pool, ensure_schema, PgPool, PoolConfig};
pub use repositories::{PgDirectory, PgStore};

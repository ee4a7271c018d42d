//! Session cache client.
//!
//! Values are JSON documents stored under string keys with a configured
//! retention. Redis is the production backend; [`MemoryStore`] serves tests
//! and single-process deployments.

mod cache;
mod error;
mod keep;
mod redis_store;
mod store;

pub use cache::SessionCache;
pub use error::{Result, StoreError};
pub use keep::{Keep, FOREVER};
pub use redis_store::{RedisConfig, RedisStore};
pub use store::{MemoryStore, SessionStore};

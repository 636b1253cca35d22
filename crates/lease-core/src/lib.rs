//! Time-bounded page leases over an expiring key-value store.
//!
//! A lease grants one session exclusive use of a named page for a fixed
//! window. The store's own key expiry ends a lease that is never released.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lease_core::{LeaseConfig, LeaseManager, MemoryStore, SessionId};
//!
//! let manager = LeaseManager::new(Arc::new(MemoryStore::new()), LeaseConfig::default());
//!
//! // Take the page
//! let lease = manager.acquire("checkout-page", None).await?;
//!
//! // Anyone can look
//! let current = manager.inspect("checkout-page").await?;
//!
//! // Only the holder can give it back
//! manager.release("checkout-page", &lease.session_id).await?;
//! ```

mod config;
mod error;
mod lease;
mod manager;
mod memory;
mod store;

#[cfg(feature = "redis-store")]
mod redis_store;

pub use config::{InvalidConfig, LeaseConfig, WriteMode, DEFAULT_LEASE_TTL, MAX_LEASE_TTL};
pub use error::{ErrorKind, LeaseError, LeaseResult, StoreError, StoreResult};
pub use lease::{Lease, SessionId};
pub use manager::LeaseManager;
pub use memory::MemoryStore;
pub use store::{KeyTtl, LeaseStore, StoredEntry};

#[cfg(feature = "redis-store")]
pub use redis_store::RedisStore;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        ErrorKind, Lease, LeaseConfig, LeaseError, LeaseManager, LeaseStore, MemoryStore,
        SessionId,
    };
}

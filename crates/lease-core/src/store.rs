//! Contract over a key-value store with per-key expiration.

use std::time::Duration;

use async_trait::async_trait;

use crate::StoreResult;

/// Remaining lifetime of a key as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key expires in this many whole seconds.
    Expires(u64),
    /// The key exists but has no expiry.
    Persistent,
    /// The key does not exist.
    Missing,
}

impl KeyTtl {
    /// Decode the integer reply of a Redis `TTL` command.
    ///
    /// `-1` means no expiry and `-2` means no key.
    pub fn from_redis_reply(reply: i64) -> Self {
        match reply {
            -1 => KeyTtl::Persistent,
            r if r < 0 => KeyTtl::Missing,
            r => KeyTtl::Expires(r as u64),
        }
    }

    /// Remaining seconds, if the key expires.
    pub fn seconds(&self) -> Option<u64> {
        match self {
            KeyTtl::Expires(secs) => Some(*secs),
            _ => None,
        }
    }
}

/// A value read together with its remaining lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub value: String,
    pub ttl: KeyTtl,
}

/// Primitives the lease protocol needs from its backing store.
///
/// No compare-and-swap is assumed beyond [`set_if_absent`](Self::set_if_absent).
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Read a value and its remaining TTL. `None` if absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<StoredEntry>>;

    /// Unconditionally overwrite `key`, resetting its TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Write `key` only if no live value exists. Returns whether it was written.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Delete `key`. Returns whether a value existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Remaining lifetime of `key`.
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_from_redis_reply() {
        assert_eq!(KeyTtl::from_redis_reply(300), KeyTtl::Expires(300));
        assert_eq!(KeyTtl::from_redis_reply(0), KeyTtl::Expires(0));
        assert_eq!(KeyTtl::from_redis_reply(-1), KeyTtl::Persistent);
        assert_eq!(KeyTtl::from_redis_reply(-2), KeyTtl::Missing);
    }

    #[test]
    fn test_ttl_seconds() {
        assert_eq!(KeyTtl::Expires(12).seconds(), Some(12));
        assert_eq!(KeyTtl::Persistent.seconds(), None);
        assert_eq!(KeyTtl::Missing.seconds(), None);
    }
}

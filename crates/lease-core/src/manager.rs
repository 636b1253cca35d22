//! Lease protocol over a [`LeaseStore`].
//!
//! All shared state lives in the store. The manager keeps no in-process
//! locks, so with [`WriteMode::Overwrite`] two concurrent creators of the
//! same page can both observe it free and the later write replaces the
//! earlier holder. [`WriteMode::IfAbsent`] closes that window with the
//! store's atomic set-if-absent.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{LeaseConfig, WriteMode};
use crate::lease::{Lease, SessionId, StoredLease};
use crate::store::{KeyTtl, LeaseStore};
use crate::{LeaseError, LeaseResult, StoreError};

/// Grants, verifies and releases page leases.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use lease_core::{LeaseConfig, LeaseManager, MemoryStore, SessionId};
///
/// let manager = LeaseManager::new(Arc::new(MemoryStore::new()), LeaseConfig::default());
///
/// let lease = manager.create("checkout-page").await?;
/// assert_eq!(lease.expire_at, 300);
///
/// // Re-entry by the holder returns the lease without extending it.
/// manager.acquire("checkout-page", Some(lease.session_id.clone())).await?;
///
/// manager.release("checkout-page", &lease.session_id).await?;
/// ```
#[derive(Clone)]
pub struct LeaseManager {
    store: Arc<dyn LeaseStore>,
    config: LeaseConfig,
}

impl std::fmt::Debug for LeaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LeaseManager {
    pub fn new(store: Arc<dyn LeaseStore>, config: LeaseConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LeaseConfig {
        &self.config
    }

    /// Mint a lease for a fresh session.
    ///
    /// The generated session can never match an existing holder, so any
    /// live lease on the page yields [`LeaseError::Conflict`].
    pub async fn create(&self, page_name: &str) -> LeaseResult<Lease> {
        self.acquire(page_name, Some(SessionId::generate())).await
    }

    /// Acquire the lease on `page_name`, or confirm it if already held.
    ///
    /// A missing or empty `session` is replaced by a generated one. Re-entry
    /// by the current holder returns the lease unchanged and does not reset
    /// its TTL.
    pub async fn acquire(
        &self,
        page_name: &str,
        session: Option<SessionId>,
    ) -> LeaseResult<Lease> {
        let session = session
            .filter(|s| !s.is_empty())
            .unwrap_or_else(SessionId::generate);

        if let Some(existing) = self.read(page_name).await? {
            return Self::reenter(existing, &session);
        }

        self.mint(page_name, session).await
    }

    /// Read the current lease, if any. No ownership check.
    pub async fn inspect(&self, page_name: &str) -> LeaseResult<Option<Lease>> {
        self.read(page_name).await
    }

    /// Current holder of `page_name`.
    pub async fn holder(&self, page_name: &str) -> LeaseResult<Option<SessionId>> {
        Ok(self.read(page_name).await?.map(|lease| lease.session_id))
    }

    /// Release the lease held by `session`.
    ///
    /// Returns `Ok(false)` when no lease exists, or when it vanished between
    /// the read and the delete. Fails with [`LeaseError::Forbidden`] if a
    /// different session holds it.
    pub async fn release(&self, page_name: &str, session: &SessionId) -> LeaseResult<bool> {
        let Some(existing) = self.read(page_name).await? else {
            debug!(page_name, "release of absent lease");
            return Ok(false);
        };

        if !existing.is_held_by(session) {
            warn!(page_name, session = %session, "release by non-holder rejected");
            return Err(LeaseError::forbidden(page_name));
        }

        let deleted = self.store.delete(page_name).await?;
        if deleted {
            info!(page_name, session = %session, "lease released");
        } else {
            debug!(page_name, "lease expired before delete");
        }
        Ok(deleted)
    }

    /// Release that never fails towards the caller.
    ///
    /// Every outcome, including [`LeaseError::Forbidden`] and store
    /// failures, is logged and swallowed.
    pub async fn release_best_effort(&self, page_name: &str, session: &SessionId) {
        match self.release(page_name, session).await {
            Ok(true) => {}
            Ok(false) => {
                info!(page_name, session = %session, "nothing to release, reporting success");
            }
            Err(err) => {
                warn!(
                    page_name,
                    session = %session,
                    kind = %err.kind(),
                    error = %err,
                    "best-effort release swallowed error"
                );
            }
        }
    }

    async fn read(&self, page_name: &str) -> LeaseResult<Option<Lease>> {
        let Some(entry) = self.store.get(page_name).await? else {
            return Ok(None);
        };

        let expire_at = match entry.ttl {
            KeyTtl::Expires(secs) => i64::try_from(secs).unwrap_or(i64::MAX),
            KeyTtl::Persistent => {
                warn!(page_name, "lease key has no expiry");
                -1
            }
            KeyTtl::Missing => return Ok(None),
        };

        let stored = StoredLease::decode(&entry.value).map_err(StoreError::from)?;
        debug!(page_name, expire_at, "lease read");
        Ok(Some(stored.with_expiry(expire_at)))
    }

    fn reenter(existing: Lease, session: &SessionId) -> LeaseResult<Lease> {
        if existing.is_held_by(session) {
            debug!(page_name = %existing.page_name, "lease re-entered by holder");
            Ok(existing)
        } else {
            warn!(page_name = %existing.page_name, "lease held by another session");
            Err(LeaseError::conflict(&existing.page_name))
        }
    }

    async fn mint(&self, page_name: &str, session: SessionId) -> LeaseResult<Lease> {
        let stored = StoredLease {
            page_name: page_name.to_string(),
            session_id: session,
        };
        let raw = stored.encode().map_err(StoreError::from)?;

        match self.config.write_mode {
            WriteMode::Overwrite => {
                self.store.set(page_name, &raw, self.config.ttl).await?;
            }
            WriteMode::IfAbsent => {
                if !self.store.set_if_absent(page_name, &raw, self.config.ttl).await? {
                    // Another writer got in between our read and write.
                    return match self.read(page_name).await? {
                        Some(existing) => Self::reenter(existing, &stored.session_id),
                        None => Err(LeaseError::conflict(page_name)),
                    };
                }
            }
        }

        info!(
            page_name,
            session = %stored.session_id,
            ttl_secs = self.config.ttl_secs(),
            "lease created"
        );
        let ttl_secs = i64::try_from(self.config.ttl_secs()).unwrap_or(i64::MAX);
        Ok(stored.with_expiry(ttl_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use crate::{ErrorKind, StoreResult, StoredEntry};
    use async_trait::async_trait;
    use std::time::Duration;

    fn manager() -> (Arc<MemoryStore>, LeaseManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = LeaseManager::new(store.clone(), LeaseConfig::default());
        (store, manager)
    }

    #[tokio::test]
    async fn test_create_mints_fresh_session() {
        let (_, manager) = manager();
        let lease = manager.create("page").await.unwrap();

        assert_eq!(lease.page_name, "page");
        assert!(lease.session_id.as_str().starts_with("sess_"));
        assert_eq!(lease.expire_at, 300);
    }

    #[tokio::test]
    async fn test_create_on_held_page_conflicts() {
        let (_, manager) = manager();
        manager.create("page").await.unwrap();

        let err = manager.create("page").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_acquire_with_empty_session_generates_one() {
        let (_, manager) = manager();
        let lease = manager
            .acquire("page", Some(SessionId::from("")))
            .await
            .unwrap();
        assert!(!lease.session_id.is_empty());
    }

    #[tokio::test]
    async fn test_acquire_uses_supplied_session() {
        let (_, manager) = manager();
        let lease = manager
            .acquire("page", Some(SessionId::from("s1")))
            .await
            .unwrap();
        assert_eq!(lease.session_id.as_str(), "s1");
        assert_eq!(
            manager.holder("page").await.unwrap(),
            Some(SessionId::from("s1"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reentry_does_not_reset_ttl() {
        let (_, manager) = manager();
        let s1 = SessionId::from("s1");
        manager.acquire("page", Some(s1.clone())).await.unwrap();

        tokio::time::advance(Duration::from_secs(100)).await;

        let again = manager.acquire("page", Some(s1)).await.unwrap();
        assert_eq!(again.expire_at, 200);
    }

    #[tokio::test]
    async fn test_release_by_non_holder_is_forbidden() {
        let (_, manager) = manager();
        manager
            .acquire("page", Some(SessionId::from("s1")))
            .await
            .unwrap();

        let err = manager
            .release("page", &SessionId::from("s2"))
            .await
            .unwrap_err();
        assert!(matches!(err, LeaseError::Forbidden { .. }));
        assert_eq!(
            manager.holder("page").await.unwrap(),
            Some(SessionId::from("s1"))
        );
    }

    #[tokio::test]
    async fn test_release_absent_is_noop() {
        let (_, manager) = manager();
        assert!(!manager.release("page", &SessionId::from("s1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_best_effort_release_swallows_forbidden() {
        let (_, manager) = manager();
        manager
            .acquire("page", Some(SessionId::from("s1")))
            .await
            .unwrap();

        manager
            .release_best_effort("page", &SessionId::from("s2"))
            .await;

        // The holder is untouched.
        assert_eq!(
            manager.holder("page").await.unwrap(),
            Some(SessionId::from("s1"))
        );
    }

    #[tokio::test]
    async fn test_persistent_key_reports_minus_one() {
        let (store, manager) = manager();
        store
            .set_persistent("page", r#"{"pageName":"page","sessionId":"s1"}"#)
            .await;

        let lease = manager.inspect("page").await.unwrap().unwrap();
        assert_eq!(lease.expire_at, -1);
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_is_store_error() {
        let store = Arc::new(MemoryStore::new());
        let config = LeaseConfig::default().with_ttl(Duration::from_secs(u64::MAX));
        let manager = LeaseManager::new(store.clone(), config);

        let err = manager.acquire("p", Some("s1".into())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupt_value_is_store_error() {
        let (store, manager) = manager();
        store
            .set("page", "not json", Duration::from_secs(10))
            .await
            .unwrap();

        let err = manager.inspect("page").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }

    /// Store whose `get` always misses, simulating a writer that lands
    /// between our read and our write.
    struct RacingStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl LeaseStore for RacingStore {
        async fn get(&self, key: &str) -> StoreResult<Option<StoredEntry>> {
            let entry = self.inner.get(key).await?;
            if entry.is_none() {
                let rival = r#"{"pageName":"page","sessionId":"rival"}"#;
                self.inner.set(key, rival, Duration::from_secs(300)).await?;
            }
            Ok(None)
        }

        async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
            self.inner.set(key, value, ttl).await
        }

        async fn set_if_absent(
            &self,
            key: &str,
            value: &str,
            ttl: Duration,
        ) -> StoreResult<bool> {
            self.inner.set_if_absent(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> StoreResult<bool> {
            self.inner.delete(key).await
        }

        async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
            self.inner.ttl(key).await
        }
    }

    #[tokio::test]
    async fn test_if_absent_mode_detects_lost_race() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
        });
        let manager = LeaseManager::new(store.clone(), LeaseConfig::default());

        let err = manager
            .acquire("page", Some(SessionId::from("s1")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let held = store.inner.get("page").await.unwrap().unwrap();
        assert!(held.value.contains("rival"));
    }

    #[tokio::test]
    async fn test_overwrite_mode_loses_update() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
        });
        let config = LeaseConfig::default().with_write_mode(WriteMode::Overwrite);
        let manager = LeaseManager::new(store.clone(), config);

        let lease = manager
            .acquire("page", Some(SessionId::from("s1")))
            .await
            .unwrap();
        assert_eq!(lease.session_id.as_str(), "s1");

        // The rival's lease was silently replaced.
        let held = store.inner.get("page").await.unwrap().unwrap();
        assert!(held.value.contains("s1"));
    }
}

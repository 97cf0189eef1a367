//! # Revocation Manager
//!
//! Allocates status list indices, flips bits on revoke, answers status
//! queries, and exports list credentials.
//!
//! ## Concurrency
//!
//! `allocate_index` takes a per-issuer mutex, so each issuer's cursor has a
//! single writer inside this process. The cursor advance is additionally a
//! compare-and-swap at the store, so writers in other processes sharing the
//! store cannot hand out the same index either; a lost race is retried up to
//! `allocation_retries` times. `revoke` sets its bit with the store's atomic
//! `set_bit` and needs no lock. Reads see whatever page snapshot the store
//! returns.
//!
//! ## Invariants
//!
//! - An index is handed out at most once, ever.
//! - Callers never see page boundaries: a full page rolls over to a new one.
//! - Revocation is terminal and idempotent.

use std::collections::HashMap;
use std::sync::Arc;

use ob_core::{IssuerId, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::bitstring::MIN_LIST_BITS;
use crate::credential::StatusListCredential;
use crate::error::StatusError;
use crate::index::{CredentialStatus, StatusListIndex};
use crate::store::StatusListPersistence;

/// Paging policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusListConfig {
    /// Bits per page.
    pub page_capacity: u32,
    /// Pages an issuer may hold before allocation fails.
    pub max_pages: u32,
    /// Compare-and-swap attempts per allocation.
    pub allocation_retries: u32,
}

impl Default for StatusListConfig {
    fn default() -> Self {
        Self {
            page_capacity: MIN_LIST_BITS,
            max_pages: 1024,
            allocation_retries: 8,
        }
    }
}

impl StatusListConfig {
    /// Reject unusable values.
    pub fn validate(&self) -> Result<(), StatusError> {
        if self.page_capacity == 0 || self.page_capacity % 8 != 0 {
            return Err(StatusError::InvalidConfig(format!(
                "page capacity must be a positive multiple of 8, got {}",
                self.page_capacity
            )));
        }
        if self.max_pages == 0 {
            return Err(StatusError::InvalidConfig("max_pages must be at least 1".into()));
        }
        if self.allocation_retries == 0 {
            return Err(StatusError::InvalidConfig(
                "allocation_retries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Result of a revoke call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// The bit was clear and is now set.
    Revoked,
    /// The bit was already set; nothing changed.
    AlreadyRevoked,
}

/// Status list allocation and revocation over an injected store.
pub struct RevocationManager {
    store: Arc<dyn StatusListPersistence>,
    config: StatusListConfig,
    issuer_locks: Mutex<HashMap<IssuerId, Arc<Mutex<()>>>>,
}

impl RevocationManager {
    /// Build a manager. Fails on an invalid config.
    pub fn new(
        store: Arc<dyn StatusListPersistence>,
        config: StatusListConfig,
    ) -> Result<Self, StatusError> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            issuer_locks: Mutex::new(HashMap::new()),
        })
    }

    /// The paging policy in force.
    pub fn config(&self) -> &StatusListConfig {
        &self.config
    }

    /// Hand out the issuer's next unused index, opening pages as needed.
    pub fn allocate_index(&self, issuer: &IssuerId) -> Result<StatusListIndex, StatusError> {
        let lock = self.issuer_lock(issuer);
        let _guard = lock.lock();

        for attempt in 1..=self.config.allocation_retries {
            let page = match self.store.current_page(issuer)? {
                Some(page) => page,
                None => self.open_page(issuer)?,
            };
            let next = self
                .store
                .next_free(issuer, page)?
                .ok_or(StatusError::UnknownPage { issuer: *issuer, page })?;

            if next >= self.config.page_capacity {
                if page + 1 >= self.config.max_pages {
                    tracing::error!(issuer = %issuer, max_pages = self.config.max_pages, "status list exhausted");
                    return Err(StatusError::IndexExhausted {
                        issuer: *issuer,
                        max_pages: self.config.max_pages,
                    });
                }
                self.open_page(issuer)?;
                continue;
            }

            if self.store.try_claim_index(issuer, page, next)? {
                return Ok(StatusListIndex { page, offset: next });
            }
            tracing::debug!(issuer = %issuer, page, attempt, "status cursor moved, retrying");
        }

        Err(StatusError::AllocationContention {
            issuer: *issuer,
            attempts: self.config.allocation_retries,
        })
    }

    /// Set the credential's bit. Revoking twice is not an error.
    pub fn revoke(
        &self,
        issuer: &IssuerId,
        index: StatusListIndex,
        reason: Option<&str>,
    ) -> Result<RevokeOutcome, StatusError> {
        self.ensure_allocated(issuer, index)?;
        if self.store.set_bit(issuer, index.page, index.offset)? {
            tracing::debug!(issuer = %issuer, index = %index, "already revoked");
            return Ok(RevokeOutcome::AlreadyRevoked);
        }
        tracing::info!(issuer = %issuer, index = %index, reason = reason.unwrap_or(""), "credential revoked");
        Ok(RevokeOutcome::Revoked)
    }

    /// Whether the credential's bit is set.
    pub fn is_revoked(&self, issuer: &IssuerId, index: StatusListIndex) -> Result<bool, StatusError> {
        self.ensure_allocated(issuer, index)?;
        self.store
            .load_page(issuer, index.page)?
            .ok_or_else(|| unknown_index(issuer, index))?
            .get(index.offset)
    }

    /// Lifecycle state of the credential at `index`.
    pub fn status(&self, issuer: &IssuerId, index: StatusListIndex) -> Result<CredentialStatus, StatusError> {
        self.is_revoked(issuer, index).map(CredentialStatus::from_bit)
    }

    /// Number of pages the issuer holds.
    pub fn page_count(&self, issuer: &IssuerId) -> Result<u32, StatusError> {
        Ok(self.store.current_page(issuer)?.map(|p| p + 1).unwrap_or(0))
    }

    /// Snapshot one page as an unsigned `StatusList2021Credential`.
    pub fn export_status_list(
        &self,
        issuer: &IssuerId,
        page: u32,
        list_url: &str,
        issuer_url: &str,
    ) -> Result<StatusListCredential, StatusError> {
        let bits = self
            .store
            .load_page(issuer, page)?
            .ok_or(StatusError::UnknownPage { issuer: *issuer, page })?;
        StatusListCredential::new(list_url, issuer_url, Timestamp::now(), &bits)
    }

    fn open_page(&self, issuer: &IssuerId) -> Result<u32, StatusError> {
        let page = self.store.allocate_page(issuer, self.config.page_capacity)?;
        tracing::info!(issuer = %issuer, page, capacity = self.config.page_capacity, "opened status list page");
        Ok(page)
    }

    /// Fail unless `index` was handed out.
    fn ensure_allocated(&self, issuer: &IssuerId, index: StatusListIndex) -> Result<(), StatusError> {
        let next = self
            .store
            .next_free(issuer, index.page)?
            .ok_or_else(|| unknown_index(issuer, index))?;
        if index.offset >= next {
            return Err(unknown_index(issuer, index));
        }
        Ok(())
    }

    fn issuer_lock(&self, issuer: &IssuerId) -> Arc<Mutex<()>> {
        Arc::clone(self.issuer_locks.lock().entry(*issuer).or_default())
    }
}

fn unknown_index(issuer: &IssuerId, index: StatusListIndex) -> StatusError {
    StatusError::UnknownIndex {
        issuer: *issuer,
        page: index.page,
        offset: index.offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstring::Bitstring;
    use crate::store::InMemoryStatusStore;
    use std::collections::HashSet;

    fn manager(capacity: u32, max_pages: u32) -> RevocationManager {
        RevocationManager::new(
            Arc::new(InMemoryStatusStore::new()),
            StatusListConfig {
                page_capacity: capacity,
                max_pages,
                allocation_retries: 4,
            },
        )
        .unwrap()
    }

    #[test]
    fn first_allocation_opens_page_zero() {
        let mgr = manager(64, 4);
        let issuer = IssuerId::new();
        assert_eq!(mgr.page_count(&issuer).unwrap(), 0);
        assert_eq!(mgr.allocate_index(&issuer).unwrap(), StatusListIndex { page: 0, offset: 0 });
        assert_eq!(mgr.allocate_index(&issuer).unwrap(), StatusListIndex { page: 0, offset: 1 });
        assert_eq!(mgr.page_count(&issuer).unwrap(), 1);
    }

    #[test]
    fn full_page_rolls_over_transparently() {
        let mgr = manager(8, 4);
        let issuer = IssuerId::new();
        let indices: Vec<_> = (0..10).map(|_| mgr.allocate_index(&issuer).unwrap()).collect();
        assert_eq!(indices[7], StatusListIndex { page: 0, offset: 7 });
        assert_eq!(indices[8], StatusListIndex { page: 1, offset: 0 });
        assert_eq!(indices[9], StatusListIndex { page: 1, offset: 1 });
    }

    #[test]
    fn exhaustion_is_a_capacity_error() {
        let mgr = manager(8, 2);
        let issuer = IssuerId::new();
        for _ in 0..16 {
            mgr.allocate_index(&issuer).unwrap();
        }
        let err = mgr.allocate_index(&issuer).unwrap_err();
        assert!(matches!(err, StatusError::IndexExhausted { max_pages: 2, .. }));
        assert!(err.class().is_retryable());
    }

    #[test]
    fn revoke_is_idempotent_and_terminal() {
        let mgr = manager(64, 1);
        let issuer = IssuerId::new();
        let idx = mgr.allocate_index(&issuer).unwrap();
        let other = mgr.allocate_index(&issuer).unwrap();

        assert!(!mgr.is_revoked(&issuer, idx).unwrap());
        assert_eq!(mgr.revoke(&issuer, idx, Some("issued in error")).unwrap(), RevokeOutcome::Revoked);
        assert_eq!(mgr.revoke(&issuer, idx, None).unwrap(), RevokeOutcome::AlreadyRevoked);
        assert!(mgr.is_revoked(&issuer, idx).unwrap());
        assert_eq!(mgr.status(&issuer, idx).unwrap(), CredentialStatus::Revoked);
        assert!(!mgr.is_revoked(&issuer, other).unwrap());
    }

    #[test]
    fn unallocated_indices_are_unknown() {
        let mgr = manager(64, 1);
        let issuer = IssuerId::new();
        let never = StatusListIndex { page: 0, offset: 0 };
        assert!(matches!(mgr.is_revoked(&issuer, never), Err(StatusError::UnknownIndex { .. })));

        mgr.allocate_index(&issuer).unwrap();
        let beyond_cursor = StatusListIndex { page: 0, offset: 5 };
        assert!(matches!(mgr.revoke(&issuer, beyond_cursor, None), Err(StatusError::UnknownIndex { .. })));
        let other_page = StatusListIndex { page: 3, offset: 0 };
        assert!(matches!(mgr.is_revoked(&issuer, other_page), Err(StatusError::UnknownIndex { .. })));
    }

    #[test]
    fn export_reflects_revocations() {
        let mgr = manager(64, 1);
        let issuer = IssuerId::new();
        let a = mgr.allocate_index(&issuer).unwrap();
        let b = mgr.allocate_index(&issuer).unwrap();
        mgr.revoke(&issuer, b, None).unwrap();

        let list = mgr
            .export_status_list(&issuer, 0, "https://h/status/x/0", "https://h/issuers/x")
            .unwrap();
        let bits = list.bitstring().unwrap();
        assert_eq!(bits.len(), 64);
        assert!(!bits.get(a.offset).unwrap());
        assert!(bits.get(b.offset).unwrap());
        assert!(matches!(
            mgr.export_status_list(&issuer, 1, "u", "i"),
            Err(StatusError::UnknownPage { page: 1, .. })
        ));
    }

    #[test]
    fn concurrent_allocations_never_collide() {
        let mgr = Arc::new(manager(64, 64));
        let issuer = IssuerId::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mgr = Arc::clone(&mgr);
                std::thread::spawn(move || {
                    (0..50).map(|_| mgr.allocate_index(&issuer).unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for idx in h.join().unwrap() {
                assert!(seen.insert(idx), "duplicate index {idx}");
            }
        }
        assert_eq!(seen.len(), 400);
    }

    #[test]
    fn revokers_sharing_a_store_keep_each_others_bits() {
        let store = Arc::new(InMemoryStatusStore::new());
        let config = StatusListConfig {
            page_capacity: 256,
            max_pages: 1,
            allocation_retries: 4,
        };
        // Two managers stand in for two processes: no mutex in common.
        let a = Arc::new(RevocationManager::new(store.clone(), config).unwrap());
        let b = Arc::new(RevocationManager::new(store, config).unwrap());
        let issuer = IssuerId::new();
        let indices: Vec<_> = (0..200).map(|_| a.allocate_index(&issuer).unwrap()).collect();

        let handles: Vec<_> = indices
            .chunks(25)
            .enumerate()
            .map(|(n, batch)| {
                let mgr = if n % 2 == 0 { Arc::clone(&a) } else { Arc::clone(&b) };
                let batch = batch.to_vec();
                std::thread::spawn(move || {
                    for idx in batch {
                        assert_eq!(mgr.revoke(&issuer, idx, None).unwrap(), RevokeOutcome::Revoked);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        for idx in &indices {
            assert!(b.is_revoked(&issuer, *idx).unwrap(), "bit {idx} was lost");
        }
        let bits = a.export_status_list(&issuer, 0, "u", "i").unwrap().bitstring().unwrap();
        assert_eq!(bits.count_set(), 200);
    }

    /// A store whose cursor always appears to have moved.
    struct AlwaysRacing(InMemoryStatusStore);

    impl StatusListPersistence for AlwaysRacing {
        fn load_page(&self, i: &IssuerId, p: u32) -> Result<Option<Bitstring>, StatusError> {
            self.0.load_page(i, p)
        }
        fn save_page(&self, i: &IssuerId, p: u32, b: &Bitstring) -> Result<(), StatusError> {
            self.0.save_page(i, p, b)
        }
        fn allocate_page(&self, i: &IssuerId, c: u32) -> Result<u32, StatusError> {
            self.0.allocate_page(i, c)
        }
        fn current_page(&self, i: &IssuerId) -> Result<Option<u32>, StatusError> {
            self.0.current_page(i)
        }
        fn next_free(&self, i: &IssuerId, p: u32) -> Result<Option<u32>, StatusError> {
            self.0.next_free(i, p)
        }
        fn set_bit(&self, i: &IssuerId, p: u32, o: u32) -> Result<bool, StatusError> {
            self.0.set_bit(i, p, o)
        }
        fn try_claim_index(&self, _: &IssuerId, _: u32, _: u32) -> Result<bool, StatusError> {
            Ok(false)
        }
    }

    #[test]
    fn lost_races_are_bounded() {
        let mgr = RevocationManager::new(
            Arc::new(AlwaysRacing(InMemoryStatusStore::new())),
            StatusListConfig {
                page_capacity: 8,
                max_pages: 1,
                allocation_retries: 3,
            },
        )
        .unwrap();
        let err = mgr.allocate_index(&IssuerId::new()).unwrap_err();
        assert!(matches!(err, StatusError::AllocationContention { attempts: 3, .. }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let store: Arc<dyn StatusListPersistence> = Arc::new(InMemoryStatusStore::new());
        let bad = StatusListConfig {
            page_capacity: 7,
            ..StatusListConfig::default()
        };
        assert!(RevocationManager::new(Arc::clone(&store), bad).is_err());
        let zero_pages = StatusListConfig {
            max_pages: 0,
            ..StatusListConfig::default()
        };
        assert!(RevocationManager::new(store, zero_pages).is_err());
    }
}

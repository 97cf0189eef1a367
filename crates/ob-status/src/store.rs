//! # Status List Persistence
//!
//! The narrow storage interface the revocation manager drives, and an
//! in-memory implementation.
//!
//! Each issuer owns an append-only sequence of pages. A page is a bitstring
//! plus a next-free cursor. The cursor only moves forward, through
//! [`StatusListPersistence::try_claim_index`], which is a compare-and-swap:
//! it succeeds only if the cursor still holds the value the caller read.
//! Revocation bits are set in place through
//! [`StatusListPersistence::set_bit`], never by writing back a whole page
//! read earlier, so concurrent revokers cannot erase each other's bits.

use std::collections::HashMap;
use std::sync::Arc;

use ob_core::IssuerId;
use parking_lot::RwLock;

use crate::bitstring::Bitstring;
use crate::error::StatusError;

/// Storage for per-issuer status list pages.
pub trait StatusListPersistence: Send + Sync {
    /// The page's bits, or `None` if the page does not exist.
    fn load_page(&self, issuer: &IssuerId, page: u32) -> Result<Option<Bitstring>, StatusError>;

    /// Replace the page's bits. The page must exist and keep its length.
    fn save_page(&self, issuer: &IssuerId, page: u32, bits: &Bitstring) -> Result<(), StatusError>;

    /// Atomically append an all-zero page of `capacity` bits and return its number.
    fn allocate_page(&self, issuer: &IssuerId, capacity: u32) -> Result<u32, StatusError>;

    /// Highest page number for the issuer, if any page exists.
    fn current_page(&self, issuer: &IssuerId) -> Result<Option<u32>, StatusError>;

    /// Next free offset on the page, or `None` if the page does not exist.
    fn next_free(&self, issuer: &IssuerId, page: u32) -> Result<Option<u32>, StatusError>;

    /// Atomically set one bit and return its previous value.
    fn set_bit(&self, issuer: &IssuerId, page: u32, offset: u32) -> Result<bool, StatusError>;

    /// Advance the page cursor from `expected` to `expected + 1`.
    ///
    /// Returns `false` without side effects if the cursor has moved.
    fn try_claim_index(&self, issuer: &IssuerId, page: u32, expected: u32) -> Result<bool, StatusError>;
}

#[derive(Debug, Clone)]
struct Page {
    bits: Bitstring,
    next_free: u32,
}

/// Thread-safe in-memory page store.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStatusStore {
    pages: Arc<RwLock<HashMap<IssuerId, Vec<Page>>>>,
}

impl InMemoryStatusStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages held for the issuer.
    pub fn page_count(&self, issuer: &IssuerId) -> usize {
        self.pages.read().get(issuer).map(Vec::len).unwrap_or(0)
    }
}

impl StatusListPersistence for InMemoryStatusStore {
    fn load_page(&self, issuer: &IssuerId, page: u32) -> Result<Option<Bitstring>, StatusError> {
        Ok(self
            .pages
            .read()
            .get(issuer)
            .and_then(|pages| pages.get(page as usize))
            .map(|p| p.bits.clone()))
    }

    fn save_page(&self, issuer: &IssuerId, page: u32, bits: &Bitstring) -> Result<(), StatusError> {
        let mut guard = self.pages.write();
        let slot = guard
            .get_mut(issuer)
            .and_then(|pages| pages.get_mut(page as usize))
            .ok_or_else(|| StatusError::Storage(format!("page {page} of issuer {issuer} does not exist")))?;
        if slot.bits.len() != bits.len() {
            return Err(StatusError::Storage(format!(
                "page {page} has {} bits, refusing to store {}",
                slot.bits.len(),
                bits.len()
            )));
        }
        slot.bits = bits.clone();
        Ok(())
    }

    fn allocate_page(&self, issuer: &IssuerId, capacity: u32) -> Result<u32, StatusError> {
        let bits = Bitstring::new(capacity)?;
        let mut guard = self.pages.write();
        let pages = guard.entry(*issuer).or_default();
        let number = u32::try_from(pages.len())
            .map_err(|_| StatusError::Storage("page count overflow".into()))?;
        pages.push(Page { bits, next_free: 0 });
        Ok(number)
    }

    fn current_page(&self, issuer: &IssuerId) -> Result<Option<u32>, StatusError> {
        Ok(self
            .pages
            .read()
            .get(issuer)
            .and_then(|pages| pages.len().checked_sub(1))
            .map(|n| n as u32))
    }

    fn next_free(&self, issuer: &IssuerId, page: u32) -> Result<Option<u32>, StatusError> {
        Ok(self
            .pages
            .read()
            .get(issuer)
            .and_then(|pages| pages.get(page as usize))
            .map(|p| p.next_free))
    }

    fn set_bit(&self, issuer: &IssuerId, page: u32, offset: u32) -> Result<bool, StatusError> {
        let mut guard = self.pages.write();
        let slot = guard
            .get_mut(issuer)
            .and_then(|pages| pages.get_mut(page as usize))
            .ok_or_else(|| StatusError::Storage(format!("page {page} of issuer {issuer} does not exist")))?;
        slot.bits.set(offset)
    }

    fn try_claim_index(&self, issuer: &IssuerId, page: u32, expected: u32) -> Result<bool, StatusError> {
        let mut guard = self.pages.write();
        let slot = guard
            .get_mut(issuer)
            .and_then(|pages| pages.get_mut(page as usize))
            .ok_or_else(|| StatusError::Storage(format!("page {page} of issuer {issuer} does not exist")))?;
        if slot.next_free != expected || expected >= slot.bits.len() {
            return Ok(false);
        }
        slot.next_free = expected + 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_appended_in_order() {
        let store = InMemoryStatusStore::new();
        let issuer = IssuerId::new();
        assert_eq!(store.current_page(&issuer).unwrap(), None);
        assert_eq!(store.allocate_page(&issuer, 64).unwrap(), 0);
        assert_eq!(store.allocate_page(&issuer, 64).unwrap(), 1);
        assert_eq!(store.current_page(&issuer).unwrap(), Some(1));
        assert_eq!(store.page_count(&issuer), 2);
        assert_eq!(store.next_free(&issuer, 1).unwrap(), Some(0));
        assert_eq!(store.next_free(&issuer, 2).unwrap(), None);
    }

    #[test]
    fn claim_is_compare_and_swap() {
        let store = InMemoryStatusStore::new();
        let issuer = IssuerId::new();
        store.allocate_page(&issuer, 8).unwrap();
        assert!(store.try_claim_index(&issuer, 0, 0).unwrap());
        assert!(!store.try_claim_index(&issuer, 0, 0).unwrap());
        assert!(store.try_claim_index(&issuer, 0, 1).unwrap());
        assert_eq!(store.next_free(&issuer, 0).unwrap(), Some(2));
    }

    #[test]
    fn claim_never_passes_capacity() {
        let store = InMemoryStatusStore::new();
        let issuer = IssuerId::new();
        store.allocate_page(&issuer, 8).unwrap();
        for i in 0..8 {
            assert!(store.try_claim_index(&issuer, 0, i).unwrap());
        }
        assert!(!store.try_claim_index(&issuer, 0, 8).unwrap());
    }

    #[test]
    fn set_bit_reports_the_previous_value() {
        let store = InMemoryStatusStore::new();
        let issuer = IssuerId::new();
        assert!(store.set_bit(&issuer, 0, 1).is_err());
        store.allocate_page(&issuer, 16).unwrap();
        assert!(!store.set_bit(&issuer, 0, 9).unwrap());
        assert!(store.set_bit(&issuer, 0, 9).unwrap());
        assert!(store.set_bit(&issuer, 0, 16).is_err());
        assert!(store.load_page(&issuer, 0).unwrap().unwrap().get(9).unwrap());
    }

    #[test]
    fn save_requires_existing_page_of_same_length() {
        let store = InMemoryStatusStore::new();
        let issuer = IssuerId::new();
        let bits = Bitstring::new(8).unwrap();
        assert!(store.save_page(&issuer, 0, &bits).is_err());
        store.allocate_page(&issuer, 16).unwrap();
        assert!(store.save_page(&issuer, 0, &bits).is_err());

        let mut ok = Bitstring::new(16).unwrap();
        ok.set(3).unwrap();
        store.save_page(&issuer, 0, &ok).unwrap();
        assert_eq!(store.load_page(&issuer, 0).unwrap(), Some(ok));
    }

    #[test]
    fn issuers_are_isolated() {
        let store = InMemoryStatusStore::new();
        let a = IssuerId::new();
        let b = IssuerId::new();
        store.allocate_page(&a, 8).unwrap();
        assert_eq!(store.current_page(&b).unwrap(), None);
        assert!(store.load_page(&b, 0).unwrap().is_none());
    }
}

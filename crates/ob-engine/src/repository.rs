//! # Repository
//!
//! The engine reaches persistent state only through [`Repository`]. The
//! relational layer behind it lives outside this workspace;
//! [`InMemoryRepository`] backs tests and single-process deployments.
//!
//! ## Invariant
//!
//! An assertion's signed credential is write-once: `persist_assertion`
//! rejects a record whose `signed_ob3` differs from the stored one.

use std::collections::HashMap;
use std::sync::Arc;

use ob_core::{AchievementId, CredentialId, ErrorClass, IssuerId};
use ob_vc::{Achievement, AssertionRecord, Issuer};
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// Repository failures.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// No record with that id.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind.
        kind: &'static str,
        /// The id looked up.
        id: String,
    },

    /// The write would break a record invariant.
    #[error("conflicting write to {kind} {id}: {reason}")]
    Conflict {
        /// Record kind.
        kind: &'static str,
        /// Record id.
        id: String,
        /// What conflicts.
        reason: String,
    },

    /// The backing store failed.
    #[error("repository storage failure: {0}")]
    Storage(String),
}

impl RepositoryError {
    /// Classification for callers.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Conflict { .. } => ErrorClass::Data,
            Self::Storage(_) => ErrorClass::Storage,
        }
    }
}

/// Record storage consumed by the engine.
pub trait Repository: Send + Sync {
    /// Load an issuer.
    fn get_issuer(&self, id: &IssuerId) -> Result<Issuer, RepositoryError>;

    /// Insert or replace an issuer.
    fn put_issuer(&self, issuer: &Issuer) -> Result<(), RepositoryError>;

    /// Load an achievement.
    fn get_achievement(&self, id: &AchievementId) -> Result<Achievement, RepositoryError>;

    /// Insert a new achievement. Achievements are never edited in place.
    fn put_achievement(&self, achievement: &Achievement) -> Result<(), RepositoryError>;

    /// Load an assertion.
    fn get_assertion(&self, id: &CredentialId) -> Result<AssertionRecord, RepositoryError>;

    /// Insert or update an assertion.
    fn persist_assertion(&self, record: &AssertionRecord) -> Result<(), RepositoryError>;
}

/// Thread-safe, cloneable in-memory map keyed by UUID.
#[derive(Debug)]
struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Read-validate-write under one write lock.
    fn upsert_with<E>(
        &self,
        id: Uuid,
        value: T,
        check: impl FnOnce(Option<&T>, &T) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut guard = self.data.write();
        check(guard.get(&id), &value)?;
        guard.insert(id, value);
        Ok(())
    }

    fn len(&self) -> usize {
        self.data.read().len()
    }
}

/// In-memory [`Repository`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    issuers: Store<Issuer>,
    achievements: Store<Achievement>,
    assertions: Store<AssertionRecord>,
}

impl InMemoryRepository {
    /// An empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored assertions.
    pub fn assertion_count(&self) -> usize {
        self.assertions.len()
    }
}

impl Repository for InMemoryRepository {
    fn get_issuer(&self, id: &IssuerId) -> Result<Issuer, RepositoryError> {
        self.issuers.get(id.as_uuid()).ok_or_else(|| not_found("issuer", id))
    }

    fn put_issuer(&self, issuer: &Issuer) -> Result<(), RepositoryError> {
        self.issuers.insert(*issuer.id.as_uuid(), issuer.clone());
        Ok(())
    }

    fn get_achievement(&self, id: &AchievementId) -> Result<Achievement, RepositoryError> {
        self.achievements
            .get(id.as_uuid())
            .ok_or_else(|| not_found("achievement", id))
    }

    fn put_achievement(&self, achievement: &Achievement) -> Result<(), RepositoryError> {
        self.achievements
            .upsert_with(*achievement.id.as_uuid(), achievement.clone(), |existing, new| {
                match existing {
                    Some(old) if old != new => Err(RepositoryError::Conflict {
                        kind: "achievement",
                        id: new.id.to_string(),
                        reason: "achievements are immutable".into(),
                    }),
                    _ => Ok(()),
                }
            })
    }

    fn get_assertion(&self, id: &CredentialId) -> Result<AssertionRecord, RepositoryError> {
        self.assertions
            .get(id.as_uuid())
            .ok_or_else(|| not_found("assertion", id))
    }

    fn persist_assertion(&self, record: &AssertionRecord) -> Result<(), RepositoryError> {
        self.assertions
            .upsert_with(*record.id.as_uuid(), record.clone(), |existing, new| {
                match existing.and_then(|old| old.signed_ob3.as_ref()) {
                    Some(signed) if new.signed_ob3.as_ref() != Some(signed) => {
                        Err(RepositoryError::Conflict {
                            kind: "assertion",
                            id: new.id.to_string(),
                            reason: "signed credential is write-once".into(),
                        })
                    }
                    _ => Ok(()),
                }
            })
    }
}

fn not_found(kind: &'static str, id: &impl std::fmt::Display) -> RepositoryError {
    RepositoryError::NotFound {
        kind,
        id: id.to_string(),
    }
}

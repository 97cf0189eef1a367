//! # ob-status — Revocation Status Lists
//!
//! Each issuer owns an append-only sequence of fixed-capacity bitstring
//! pages. Issuing a credential claims the next bit; revoking it sets that
//! bit; verifiers read the bit back, either through the
//! [`RevocationManager`] or offline from a published
//! [`StatusListCredential`].
//!
//! ## Crate Policy
//!
//! - Depends only on `ob-core` internally. Signing an exported list is the
//!   caller's concern.
//! - Storage is reached only through [`StatusListPersistence`].

pub mod bitstring;
pub mod credential;
pub mod error;
pub mod index;
pub mod manager;
pub mod store;

pub use bitstring::{Bitstring, MIN_LIST_BITS};
pub use credential::{
    StatusList2021Entry, StatusListCredential, StatusListSubject, CREDENTIALS_V1_CONTEXT,
    DATA_INTEGRITY_CONTEXT, STATUS_LIST_2021_CONTEXT,
};
pub use error::StatusError;
pub use index::{CredentialStatus, StatusListIndex, StatusPurpose};
pub use manager::{RevocationManager, RevokeOutcome, StatusListConfig};
pub use store::{InMemoryStatusStore, StatusListPersistence};

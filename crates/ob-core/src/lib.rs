//! # ob-core — Foundational Types for the Open Badges Engine
//!
//! Every other crate in the workspace depends on `ob-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every byte sequence that is signed or
//!    digested flows through `CanonicalBytes::new()`, which is pinned to one
//!    algorithm (RFC 8785 JCS). A signature over a credential is only
//!    reproducible if every build serializes it identically.
//!
//! 2. **Newtype identifiers.** `IssuerId`, `AchievementId`, `CredentialId`
//!    and `KeyId` cannot be confused with each other.
//!
//! 3. **UTC-only timestamps.** `Timestamp` renders `YYYY-MM-DDTHH:MM:SSZ`,
//!    so the same instant always canonicalizes to the same bytes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ob-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::{CanonicalBytes, CanonicalizationScheme};
pub use digest::{hex_encode, sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, ErrorClass, IdentifierError, TimestampError};
pub use identity::{AchievementId, CredentialId, IssuerId, KeyId};
pub use temporal::Timestamp;

//! # ob-vc — Open Badges Credential Documents
//!
//! - **Records** ([`Issuer`], [`Achievement`], [`AssertionRecord`]): the
//!   state a credential is built from.
//! - **Builder**: total, deterministic mapping from records to OB2 hosted
//!   documents and OB3 verifiable credentials.
//! - **Recipients**: plaintext or salted-hash identities, and matching a
//!   claimed identity against either.
//! - **Proof engine** ([`ProofEngine`]): `eddsa-jcs-2022` Data Integrity
//!   proofs, keyed by verification method.
//!
//! ## Security Invariants
//!
//! - All signed bytes come from [`CanonicalBytes`](ob_core::CanonicalBytes).
//! - OB3 `@context` and `type` arrays are compile-time constants.
//! - A hashed recipient's plaintext never reaches a document.

pub mod builder;
pub mod document;
pub mod error;
pub mod ob2;
pub mod ob3;
pub mod proof;
pub mod recipient;
pub mod records;
pub mod urls;

pub use builder::{build_ob2, build_ob2_badge_class, build_ob2_issuer, build_ob3};
pub use document::{sniff_format, CredentialDocument, CredentialFormat};
pub use error::VcError;
pub use ob2::{Ob2Assertion, Ob2BadgeClass, Ob2Issuer, OB2_CONTEXT};
pub use ob3::{Ob3Credential, OB3_CONTEXT, OB3_CONTEXTS, OB3_TYPES};
pub use proof::{
    DataIntegrityProof, ProofEngine, ProofFailure, ProofPurpose, VerificationResult, CRYPTOSUITE,
    DATA_INTEGRITY_PROOF,
};
pub use recipient::{
    hash_identity, recipient_matches, HashedIdentity, IdentityKind, Recipient, RecipientIdentity,
};
pub use records::{Achievement, Alignment, AssertionRecord, Evidence, Issuer, Revocation};
pub use urls::HostedUrls;

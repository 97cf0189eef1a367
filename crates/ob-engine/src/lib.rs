//! # ob-engine — Open Badges Issuance and Verification
//!
//! Ties the workspace together behind [`CredentialEngine`]:
//!
//! - **Issuance**: build the OB2 and OB3 projections of an award, allocate
//!   a status list index, sign the OB3 credential, and optionally bake it
//!   into an image.
//! - **Revocation**: flip the status bit and mark the record; idempotent.
//! - **Verification**: structure, proof, revocation and expiry, reported
//!   per check.
//! - **Baking**: embed a stored credential (or its hosted URL) in a PNG or
//!   SVG, and recover one from an image.
//! - **Status lists**: signed `StatusList2021Credential` export per page.
//!
//! Collaborators are injected: a [`Repository`](repository::Repository), a
//! status list store, and the issuer [`Keyring`](ob_crypto::Keyring).
//! Callers pass an [`AuthContext`] carrying the principal and its scopes.
//!
//! ## Crate Policy
//!
//! - No `.unwrap()` outside tests.
//! - Key material and recipient plaintexts are never logged.

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod issuance;
pub mod repository;
pub mod telemetry;
pub mod verification;

pub use auth::{AuthContext, SCOPE_CREDENTIAL_READONLY, SCOPE_CREDENTIAL_UPSERT, SCOPE_PROFILE_UPDATE};
pub use config::{ConfigError, EngineConfig};
pub use engine::{CredentialEngine, IssuerRegistration, NewAchievement, NewIssuer};
pub use error::EngineError;
pub use issuance::{ExtractedCredential, IssueRequest, IssuedCredential, RevocationReceipt};
pub use repository::{InMemoryRepository, Repository, RepositoryError};
pub use telemetry::init_tracing;
pub use verification::{CredentialRef, VerificationChecks, VerificationReport};

//! # ob-crypto — Cryptographic Primitives
//!
//! - **Ed25519** key pairs, signatures, and verification. The only signable
//!   input is a [`SigningInput`], itself built from two
//!   [`CanonicalBytes`](ob_core::CanonicalBytes) values, so nothing
//!   non-canonical can ever be signed.
//! - **Multibase** (`z` + base58-btc) for proof values and Multikey public
//!   keys.
//! - **Key providers**: the [`KeyProvider`] trait the proof engine consumes,
//!   an in-memory [`Keyring`] with rotation, and a [`CachingKeyResolver`]
//!   keyed by key id.
//!
//! ## Crate Policy
//!
//! - Depends only on `ob-core` internally.
//! - Private key bytes are never serialized, logged, or exposed.
//! - Tests use real Ed25519; nothing cryptographic is mocked.

pub mod ed25519;
pub mod error;
pub mod key_provider;
pub mod multibase;

pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, SigningInput};
pub use error::CryptoError;
pub use key_provider::{
    CachingKeyResolver, KeyProvider, Keyring, SigningKeyHandle, VerificationMethod,
};

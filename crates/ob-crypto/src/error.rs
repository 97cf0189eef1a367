//! # Cryptographic Error Types

use thiserror::Error;

/// Errors from cryptographic operations and key lookups.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("Ed25519 verification failed: {0}")]
    VerificationFailed(String),

    /// Public key bytes are not a valid Ed25519 point, or have the wrong
    /// multicodec prefix.
    #[error("invalid Ed25519 public key: {0}")]
    InvalidPublicKey(String),

    /// Signature bytes have the wrong length or encoding.
    #[error("invalid Ed25519 signature: {0}")]
    InvalidSignature(String),

    /// Multibase decoding failed.
    #[error("multibase decode error: {0}")]
    Multibase(String),

    /// Hex decoding failed.
    #[error("hex decode error: {0}")]
    HexDecode(String),

    /// No key is registered under this key id.
    #[error("unknown verification method: {0}")]
    UnknownKey(String),

    /// The issuer has no signing key. This is a configuration error, not
    /// an untrusted-input error.
    #[error("no signing key configured for issuer {0}")]
    NoSigningKey(String),

    /// Key material could not be loaded from its source.
    #[error("key material unavailable: {0}")]
    KeyMaterial(String),
}

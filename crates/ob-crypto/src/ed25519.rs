//! # Ed25519 Signing and Verification
//!
//! ## Security Invariant
//!
//! - The only signable value is a [`SigningInput`]: the SHA-256 of the
//!   canonical proof configuration followed by the SHA-256 of the canonical
//!   document (the `eddsa-jcs-2022` hash data). Both halves are
//!   `&CanonicalBytes`, so raw bytes cannot be signed.
//! - `Ed25519KeyPair` does not implement `Serialize` and its `Debug` output
//!   is redacted.
//!
//! ## Encodings
//!
//! - Public keys serialize as Multikey multibase (`z6Mk...`): the
//!   `ed25519-pub` multicodec prefix `0xed 0x01` followed by the 32 key bytes.
//! - Signatures serialize as multibase base58-btc.

use ed25519_dalek::{Signer, Verifier};
use ob_core::{sha256_digest, CanonicalBytes};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CryptoError;
use crate::multibase::{decode_base58btc, encode_base58btc};

/// Multicodec prefix for an Ed25519 public key.
const ED25519_PUB_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// The 64-byte hash data a Data Integrity proof signs.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningInput([u8; 64]);

impl SigningInput {
    /// `SHA-256(proof_config) || SHA-256(document)`.
    pub fn new(proof_config: &CanonicalBytes, document: &CanonicalBytes) -> Self {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(sha256_digest(proof_config).as_bytes());
        out[32..].copy_from_slice(sha256_digest(document).as_bytes());
        Self(out)
    }

    /// The bytes handed to the signature primitive.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl std::fmt::Debug for SigningInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningInput({}...)", hex_prefix(&self.0))
    }
}

/// An Ed25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Wrap raw key bytes, rejecting bytes that are not a curve point.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// The raw 32-byte key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Multikey `publicKeyMultibase` rendering.
    pub fn to_multibase(&self) -> String {
        let mut prefixed = Vec::with_capacity(34);
        prefixed.extend_from_slice(&ED25519_PUB_MULTICODEC);
        prefixed.extend_from_slice(&self.0);
        encode_base58btc(&prefixed)
    }

    /// Parse a Multikey `publicKeyMultibase` value.
    pub fn from_multibase(s: &str) -> Result<Self, CryptoError> {
        let bytes = decode_base58btc(s)?;
        let key = bytes
            .strip_prefix(&ED25519_PUB_MULTICODEC)
            .ok_or_else(|| CryptoError::InvalidPublicKey("missing ed25519-pub multicodec prefix".into()))?;
        let arr: [u8; 32] = key.try_into().map_err(|_| {
            CryptoError::InvalidPublicKey(format!("expected 32 key bytes, got {}", key.len()))
        })?;
        Self::from_bytes(arr)
    }

    /// Verify a signature over a signing input.
    pub fn verify(&self, input: &SigningInput, signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let vk = ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        vk.verify(input.as_bytes(), &sig)
            .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_multibase())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_multibase(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_multibase())
    }
}

/// An Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    /// Wrap raw signature bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// The raw 64-byte signature.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Multibase base58-btc rendering, as used in `proofValue`.
    pub fn to_multibase(&self) -> String {
        encode_base58btc(&self.0)
    }

    /// Parse a `proofValue`.
    pub fn from_multibase(s: &str) -> Result<Self, CryptoError> {
        let bytes = decode_base58btc(s)?;
        let arr: [u8; 64] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidSignature(format!("expected 64 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex_prefix(&self.0))
    }
}

/// An Ed25519 key pair. Never serialized.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Ed25519KeyPair {
    /// Generate a new random key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Deterministic key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Key pair from a 64-character hex seed.
    pub fn from_seed_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex_to_bytes(hex.trim())?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::KeyMaterial(format!(
                "expected a 32-byte seed (64 hex chars), got {} bytes",
                bytes.len()
            ))
        })?;
        Ok(Self::from_seed(&seed))
    }

    /// The public half.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a signing input.
    pub fn sign(&self, input: &SigningInput) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(input.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, CryptoError> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return Err(CryptoError::HexDecode("hex string must be ASCII with even length".into()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| CryptoError::HexDecode(format!("invalid hex at position {i}: {e}")))
        })
        .collect()
}

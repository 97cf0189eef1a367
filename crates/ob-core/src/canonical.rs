//! # Canonical Serialization — Pinned JCS Byte Production
//!
//! `CanonicalBytes` is the sole construction path for bytes that are signed
//! or digested anywhere in the engine.
//!
//! ## Security Invariant
//!
//! The inner `Vec<u8>` is private. The only constructors run the value
//! through the coercion pipeline (float rejection) and then RFC 8785 JSON
//! Canonicalization Scheme serialization. A proof produced today must verify
//! against bytes produced by any later build, so the scheme is pinned by
//! [`CanonicalizationScheme`] and never negotiated at runtime.
//!
//! ## Coercion Rules
//!
//! 1. **Reject non-integer numbers.** Credential documents carry dates,
//!    strings and identifiers; a float is almost always a mapping bug, and
//!    float formatting is the least portable corner of JCS.
//! 2. **Objects** are emitted with keys sorted by UTF-16 code units, compact
//!    separators, no insignificant whitespace.
//! 3. **Strings** are emitted as UTF-8 with the minimal JSON escaping.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// The canonicalization algorithm every signature in the engine is bound to.
///
/// There is exactly one variant. Adding another requires a new cryptosuite
/// identifier, since historical proofs must keep verifying against the
/// algorithm they were produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalizationScheme {
    /// RFC 8785 JSON Canonicalization Scheme.
    Jcs,
}

impl CanonicalizationScheme {
    /// The pinned scheme.
    pub const PINNED: Self = Self::Jcs;

    /// Stable identifier, as recorded in logs and documentation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jcs => "RFC8785-JCS",
        }
    }
}

impl std::fmt::Display for CanonicalizationScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes produced exclusively by the pinned canonicalization pipeline.
///
/// # Invariants
///
/// - Constructed only via [`CanonicalBytes::new()`] or
///   [`CanonicalBytes::from_value()`].
/// - No non-integer numbers.
/// - Sorted keys, compact separators (RFC 8785).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// `FloatRejected` if the value contains a non-integer number,
    /// `SerializationFailed` if serde cannot represent it as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Canonicalize an already-materialized JSON value.
    ///
    /// Used on untrusted documents, which arrive as `serde_json::Value`.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let coerced = coerce_json_value(value)?;
        let s = serde_jcs::to_string(&coerced)?;
        Ok(Self(s.into_bytes()))
    }

    /// The scheme these bytes were produced with.
    pub fn scheme(&self) -> CanonicalizationScheme {
        CanonicalizationScheme::PINNED
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn coerce_json_value(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value),
        Value::Number(ref n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(value)
        }
        Value::Object(map) => {
            let mut coerced = serde_json::Map::new();
            for (k, v) in map {
                coerced.insert(k, coerce_json_value(v)?);
            }
            Ok(Value::Object(coerced))
        }
        Value::Array(arr) => {
            let coerced: Result<Vec<_>, _> = arr.into_iter().map(coerce_json_value).collect();
            Ok(Value::Array(coerced?))
        }
    }
}

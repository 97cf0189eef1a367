//! # Multibase (base58-btc)
//!
//! Data Integrity proof values and Multikey public keys are multibase
//! strings. Only the base58-btc encoding (prefix `z`) is produced or
//! accepted.

use crate::error::CryptoError;

/// Multibase prefix for base58-btc.
pub const BASE58BTC_PREFIX: char = 'z';

/// Encode bytes as a `z`-prefixed base58-btc multibase string.
pub fn encode_base58btc(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    out.push(BASE58BTC_PREFIX);
    out.push_str(&bs58::encode(bytes).into_string());
    out
}

/// Decode a `z`-prefixed base58-btc multibase string.
pub fn decode_base58btc(s: &str) -> Result<Vec<u8>, CryptoError> {
    let body = s.strip_prefix(BASE58BTC_PREFIX).ok_or_else(|| {
        CryptoError::Multibase(format!(
            "expected base58-btc prefix '{BASE58BTC_PREFIX}', got {:?}",
            s.chars().next()
        ))
    })?;
    if body.is_empty() {
        return Err(CryptoError::Multibase("empty multibase body".into()));
    }
    bs58::decode(body)
        .into_vec()
        .map_err(|e| CryptoError::Multibase(e.to_string()))
}

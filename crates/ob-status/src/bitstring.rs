//! # Revocation Bitstring
//!
//! One bit per credential. Bit 0 is the most significant bit of byte 0, the
//! ordering StatusList2021 verifiers expect. The wire form (`encodedList`)
//! is the raw bytes GZIP-compressed and then base64url-encoded without
//! padding.

use std::io::{Read, Write};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::StatusError;

/// Smallest list StatusList2021 permits (16 KiB of bits), and the default
/// page capacity.
pub const MIN_LIST_BITS: u32 = 131_072;

/// Upper bound on a decoded list, guarding against compression bombs.
const MAX_DECODED_BYTES: u64 = 16 * 1024 * 1024;

/// A fixed-length bit array.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitstring {
    bytes: Vec<u8>,
    len: u32,
}

impl Bitstring {
    /// An all-zero bitstring of `len` bits. `len` must be a positive multiple of 8.
    pub fn new(len: u32) -> Result<Self, StatusError> {
        if len == 0 || len % 8 != 0 {
            return Err(StatusError::InvalidConfig(format!(
                "bitstring length must be a positive multiple of 8, got {len}"
            )));
        }
        Ok(Self {
            bytes: vec![0u8; (len / 8) as usize],
            len,
        })
    }

    /// Wrap raw bytes; the length is eight bits per byte.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, StatusError> {
        let len = u32::try_from(bytes.len())
            .ok()
            .and_then(|n| n.checked_mul(8))
            .ok_or_else(|| StatusError::Decoding("bitstring too long".into()))?;
        if len == 0 {
            return Err(StatusError::Decoding("empty bitstring".into()));
        }
        Ok(Self { bytes, len })
    }

    /// Length in bits.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Always false; a bitstring has at least eight bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw bytes, MSB-first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Read bit `offset`.
    pub fn get(&self, offset: u32) -> Result<bool, StatusError> {
        let (byte, mask) = self.locate(offset)?;
        Ok(self.bytes[byte] & mask != 0)
    }

    /// Set bit `offset`. Returns the previous value.
    pub fn set(&mut self, offset: u32) -> Result<bool, StatusError> {
        let (byte, mask) = self.locate(offset)?;
        let was = self.bytes[byte] & mask != 0;
        self.bytes[byte] |= mask;
        Ok(was)
    }

    /// Number of set bits.
    pub fn count_set(&self) -> u32 {
        self.bytes.iter().map(|b| b.count_ones()).sum()
    }

    /// GZIP, then base64url without padding.
    pub fn encode(&self) -> Result<String, StatusError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&self.bytes)
            .map_err(|e| StatusError::Encoding(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| StatusError::Encoding(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(compressed))
    }

    /// Inverse of [`encode`](Self::encode). Trailing `=` padding is tolerated.
    pub fn decode(encoded: &str) -> Result<Self, StatusError> {
        let compressed = URL_SAFE_NO_PAD
            .decode(encoded.trim_end_matches('='))
            .map_err(|e| StatusError::Decoding(format!("base64url: {e}")))?;
        let mut bytes = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .take(MAX_DECODED_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| StatusError::Decoding(format!("gzip: {e}")))?;
        if bytes.len() as u64 > MAX_DECODED_BYTES {
            return Err(StatusError::Decoding(format!(
                "decoded list exceeds {MAX_DECODED_BYTES} bytes"
            )));
        }
        Self::from_bytes(bytes)
    }

    fn locate(&self, offset: u32) -> Result<(usize, u8), StatusError> {
        if offset >= self.len {
            return Err(StatusError::OutOfRange {
                offset,
                len: self.len,
            });
        }
        Ok(((offset / 8) as usize, 0x80 >> (offset % 8)))
    }
}

impl std::fmt::Debug for Bitstring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bitstring(len={}, set={})", self.len, self.count_set())
    }
}

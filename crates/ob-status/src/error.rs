//! # Status List Error Types

use ob_core::{ErrorClass, IssuerId};
use thiserror::Error;

/// Errors from status list allocation, mutation, and encoding.
#[derive(Error, Debug)]
pub enum StatusError {
    /// Every page the issuer may hold is full.
    #[error("status list exhausted for issuer {issuer}: all {max_pages} pages are full")]
    IndexExhausted {
        /// The issuer.
        issuer: IssuerId,
        /// Configured page cap.
        max_pages: u32,
    },

    /// The cursor kept moving under us for every allowed attempt.
    #[error("index allocation for issuer {issuer} lost the cursor race {attempts} times")]
    AllocationContention {
        /// The issuer.
        issuer: IssuerId,
        /// Attempts made.
        attempts: u32,
    },

    /// The index was never allocated, or is outside the page.
    #[error("unknown status list index {page}/{offset} for issuer {issuer}")]
    UnknownIndex {
        /// The issuer.
        issuer: IssuerId,
        /// Page number.
        page: u32,
        /// Bit offset within the page.
        offset: u32,
    },

    /// The issuer has no such page.
    #[error("unknown status list page {page} for issuer {issuer}")]
    UnknownPage {
        /// The issuer.
        issuer: IssuerId,
        /// Page number.
        page: u32,
    },

    /// Bit offset beyond the bitstring length.
    #[error("bit offset {offset} out of range for a {len}-bit list")]
    OutOfRange {
        /// Requested offset.
        offset: u32,
        /// List length in bits.
        len: u32,
    },

    /// Compressing or encoding a bitstring failed.
    #[error("status list encoding failed: {0}")]
    Encoding(String),

    /// An `encodedList` could not be decoded.
    #[error("status list decoding failed: {0}")]
    Decoding(String),

    /// Page capacity or page cap is unusable.
    #[error("invalid status list configuration: {0}")]
    InvalidConfig(String),

    /// The persistence collaborator failed.
    #[error("status list storage failure: {0}")]
    Storage(String),
}

impl StatusError {
    /// Classification for callers deciding whether to retry.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::IndexExhausted { .. } | Self::AllocationContention { .. } => ErrorClass::Capacity,
            Self::UnknownIndex { .. } | Self::UnknownPage { .. } => ErrorClass::NotFound,
            Self::OutOfRange { .. } | Self::InvalidConfig(_) => ErrorClass::Data,
            Self::Encoding(_) | Self::Decoding(_) => ErrorClass::Format,
            Self::Storage(_) => ErrorClass::Storage,
        }
    }
}

//! # Baking Error Types

use ob_core::ErrorClass;
use thiserror::Error;

/// Errors from baking and extraction.
#[derive(Error, Debug)]
pub enum BakeError {
    /// The image carries no `openbadges` payload.
    #[error("no embedded badge found")]
    NotFound,

    /// The container is structurally broken: bad signature, truncated or
    /// oversized chunk, CRC mismatch, unparseable XML.
    #[error("malformed image: {0}")]
    MalformedImage(String),

    /// The bytes are neither PNG nor SVG.
    #[error("unsupported image format")]
    UnsupportedFormat,

    /// A payload was found but is not a JSON document or a URL.
    #[error("invalid embedded payload: {0}")]
    InvalidPayload(String),
}

impl BakeError {
    /// Classification for callers.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound => ErrorClass::NotFound,
            Self::MalformedImage(_) | Self::UnsupportedFormat | Self::InvalidPayload(_) => ErrorClass::Format,
        }
    }
}

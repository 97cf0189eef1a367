//! # Error Types
//!
//! Leaf error types shared by every crate, and [`ErrorClass`], the
//! caller-facing taxonomy that each crate's error maps onto.

use thiserror::Error;

/// Caller-facing classification of a failure.
///
/// Determines whether a failure is reported, retried, or treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Missing or invalid input fields. Reported, not retried.
    Data,
    /// Signing failure or unresolvable key. Never treated as valid.
    Crypto,
    /// Status list index exhaustion. Fatal to the current issuance, retryable.
    Capacity,
    /// Malformed image or document container.
    Format,
    /// Unknown identifier, or no embedded badge.
    NotFound,
    /// The authenticated principal lacks the required scope.
    Forbidden,
    /// A collaborator (repository, status store) failed.
    Storage,
}

impl ErrorClass {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Capacity | Self::Storage)
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Crypto => "crypto",
            Self::Capacity => "capacity",
            Self::Format => "format",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Non-integer numbers are not permitted in signed documents.
    #[error("non-integer number {0} is not permitted in a canonical document")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error parsing an identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The identifier was empty.
    #[error("{kind} identifier must not be empty")]
    Empty {
        /// Which identifier kind was being parsed.
        kind: &'static str,
    },

    /// The identifier did not match the expected shape.
    #[error("invalid {kind} identifier {value:?}: {reason}")]
    Invalid {
        /// Which identifier kind was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Error parsing or constructing a timestamp.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// Strict parsing requires a `Z` suffix.
    #[error("timestamp must use Z suffix (UTC only), got {0:?}")]
    NotUtc(String),

    /// Not RFC 3339.
    #[error("invalid RFC 3339 timestamp {value:?}: {reason}")]
    Invalid {
        /// The rejected input.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// Epoch seconds outside the representable range.
    #[error("unix timestamp out of range: {0}")]
    OutOfRange(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classes() {
        assert!(ErrorClass::Capacity.is_retryable());
        assert!(ErrorClass::Storage.is_retryable());
        assert!(!ErrorClass::Data.is_retryable());
        assert!(!ErrorClass::Crypto.is_retryable());
        assert!(!ErrorClass::NotFound.is_retryable());
    }

    #[test]
    fn identifier_error_display() {
        let err = IdentifierError::Invalid {
            kind: "issuer",
            value: "nope".into(),
            reason: "not a uuid".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("issuer"));
        assert!(msg.contains("nope"));
    }

    #[test]
    fn float_rejected_display() {
        let msg = CanonicalizationError::FloatRejected(1.5).to_string();
        assert!(msg.contains("1.5"));
    }
}

//! # Credential Error Types

use ob_core::ErrorClass;
use thiserror::Error;

/// Errors from building, signing, and parsing credential documents.
///
/// Verification of untrusted documents does not use this type; it reports
/// through [`VerificationResult`](crate::proof::VerificationResult).
#[derive(Error, Debug)]
pub enum VcError {
    /// A field the document cannot be built without is missing.
    #[error("incomplete credential data: missing {0}")]
    IncompleteData(&'static str),

    /// The records handed to the builder do not belong together.
    #[error("inconsistent credential data: {0}")]
    Inconsistent(String),

    /// A field value is present but unusable.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A JSON value is neither an OB2 assertion nor an OB3 credential.
    #[error("unrecognized credential document: {0}")]
    UnrecognizedDocument(String),

    /// Canonicalization of the document failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] ob_core::CanonicalizationError),

    /// Key lookup or signing failed.
    #[error("signing failed: {0}")]
    Crypto(#[from] ob_crypto::CryptoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VcError {
    /// Classification for callers.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::IncompleteData(_) | Self::Inconsistent(_) | Self::InvalidField { .. } => {
                ErrorClass::Data
            }
            Self::UnrecognizedDocument(_) | Self::Json(_) => ErrorClass::Format,
            Self::Canonicalization(_) => ErrorClass::Data,
            Self::Crypto(_) => ErrorClass::Crypto,
        }
    }
}

//! # Engine Error Types
//!
//! Every collaborator's error converts into [`EngineError`] with `?`.
//! [`EngineError::class`] maps each onto the shared [`ErrorClass`] taxonomy
//! so callers decide on retries without matching variants.

use ob_bake::BakeError;
use ob_core::{ErrorClass, IdentifierError};
use ob_crypto::CryptoError;
use ob_status::StatusError;
use ob_vc::VcError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::repository::RepositoryError;

/// Errors surfaced by engine pipelines.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The caller lacks the pipeline's scope.
    #[error("principal {principal} lacks scope {scope}")]
    Forbidden {
        /// Calling principal.
        principal: String,
        /// Scope required.
        scope: &'static str,
    },

    /// A request field is unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A stored record is missing something the pipeline needs.
    #[error("inconsistent record {id}: {reason}")]
    InconsistentRecord {
        /// Record id.
        id: String,
        /// What is missing.
        reason: String,
    },

    /// Repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Building or signing a credential failed.
    #[error(transparent)]
    Credential(#[from] VcError),

    /// Status list failure.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Baking or extraction failed.
    #[error(transparent)]
    Bake(#[from] BakeError),

    /// Key management failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// An identifier did not parse.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// Configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// JSON conversion failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The tracing subscriber could not be installed.
    #[error("telemetry initialisation failed: {0}")]
    Telemetry(String),
}

impl EngineError {
    /// Classification for callers.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Forbidden { .. } => ErrorClass::Forbidden,
            Self::InvalidRequest(_)
            | Self::InconsistentRecord { .. }
            | Self::Identifier(_)
            | Self::Config(_)
            | Self::Telemetry(_) => ErrorClass::Data,
            Self::Repository(e) => e.class(),
            Self::Credential(e) => e.class(),
            Self::Status(e) => e.class(),
            Self::Bake(e) => e.class(),
            Self::Crypto(_) => ErrorClass::Crypto,
            Self::Json(_) => ErrorClass::Format,
        }
    }
}

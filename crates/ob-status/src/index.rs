//! Status list positions and purposes.

use serde::{Deserialize, Serialize};

/// Position of one credential's bit: a page and an offset within it.
///
/// Allocated once and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatusListIndex {
    /// Page number, starting at 0.
    pub page: u32,
    /// Bit offset within the page.
    pub offset: u32,
}

impl std::fmt::Display for StatusListIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.page, self.offset)
    }
}

/// What a set bit means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusPurpose {
    /// The credential is revoked. Terminal.
    Revocation,
}

/// Lifecycle of a credential as seen by its status bit.
///
/// `Active -> Revoked` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialStatus {
    /// Bit clear.
    Active,
    /// Bit set.
    Revoked,
}

impl CredentialStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked)
    }

    /// Status for a bit value.
    pub fn from_bit(set: bool) -> Self {
        if set {
            Self::Revoked
        } else {
            Self::Active
        }
    }
}

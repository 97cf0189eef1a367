//! # Identifier Newtypes
//!
//! You cannot pass an `AchievementId` where an `IssuerId` is expected.
//! Issuer, achievement and credential identifiers are UUIDs internally;
//! their public IRIs are derived from the configured host base URL by the
//! credential builder. [`KeyId`] is a verification-method reference and is
//! kept verbatim, since it must round-trip through signed documents.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IdentifierError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse from a bare UUID, a `urn:uuid:` URN, or an IRI whose
            /// last path segment is the UUID.
            pub fn parse(s: &str) -> Result<Self, IdentifierError> {
                parse_uuid_tail(s, $kind).map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of an issuing organization.
    IssuerId,
    "issuer"
);

uuid_identifier!(
    /// Identifier of an achievement (OB2 BadgeClass).
    AchievementId,
    "achievement"
);

uuid_identifier!(
    /// Identifier of an issued assertion/credential.
    CredentialId,
    "credential"
);

fn parse_uuid_tail(s: &str, kind: &'static str) -> Result<Uuid, IdentifierError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(IdentifierError::Empty { kind });
    }
    let tail = trimmed
        .strip_prefix("urn:uuid:")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(trimmed);
    Uuid::parse_str(tail).map_err(|e| IdentifierError::Invalid {
        kind,
        value: s.to_string(),
        reason: e.to_string(),
    })
}

/// Reference to a verification method: `<controller>#<fragment>`.
///
/// Verification keys are looked up by `KeyId`, never by "the issuer's
/// current key", so a rotated key keeps verifying the credentials it signed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyId(String);

impl KeyId {
    /// Build a key id from a controller IRI and a fragment.
    pub fn new(controller: &str, fragment: &str) -> Result<Self, IdentifierError> {
        Self::parse(&format!("{controller}#{fragment}"))
    }

    /// Parse and validate a verification method reference.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        if s.is_empty() {
            return Err(IdentifierError::Empty { kind: "key" });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(IdentifierError::Invalid {
                kind: "key",
                value: s.to_string(),
                reason: "must not contain whitespace".into(),
            });
        }
        match s.split_once('#') {
            Some((controller, fragment)) if !controller.is_empty() && !fragment.is_empty() => {
                Ok(Self(s.to_string()))
            }
            _ => Err(IdentifierError::Invalid {
                kind: "key",
                value: s.to_string(),
                reason: "expected <controller>#<fragment>".into(),
            }),
        }
    }

    /// The full reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before `#`.
    pub fn controller(&self) -> &str {
        self.0.split_once('#').map(|(c, _)| c).unwrap_or(&self.0)
    }

    /// The part after `#`.
    pub fn fragment(&self) -> &str {
        self.0.split_once('#').map(|(_, f)| f).unwrap_or("")
    }
}

impl TryFrom<String> for KeyId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<KeyId> for String {
    fn from(value: KeyId) -> Self {
        value.0
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

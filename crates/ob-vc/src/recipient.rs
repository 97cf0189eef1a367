//! # Recipient Identities
//!
//! A recipient is either a plaintext identity (email, URL, or DID) or a
//! salted SHA-256 hash of one. Hashing is one-way: once a recipient is
//! hashed, the plaintext is gone from the record and from every document
//! built from it.
//!
//! The hash is `sha256(identity + salt)`, rendered `sha256$<hex>`. Salts are
//! 16 random bytes, hex-encoded, and are never derived from the identity.

use ob_core::hex_encode;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::VcError;

/// Prefix of a hashed identity.
pub const SHA256_PREFIX: &str = "sha256$";

/// What kind of identifier a recipient identity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    /// An email address.
    Email,
    /// An HTTP(S) URL.
    Url,
    /// A decentralized identifier.
    Did,
}

impl IdentityKind {
    /// OB2 `IdentityObject.type`.
    pub fn ob2_type(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Url => "url",
            Self::Did => "id",
        }
    }

    /// OB3 `IdentityObject.identityType`.
    pub fn ob3_identity_type(&self) -> &'static str {
        match self {
            Self::Email => "emailAddress",
            Self::Url => "ext:url",
            Self::Did => "ext:did",
        }
    }
}

/// A validated plaintext identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientIdentity {
    kind: IdentityKind,
    value: String,
}

impl RecipientIdentity {
    /// An email address, trimmed and lowercased.
    pub fn email(value: &str) -> Result<Self, VcError> {
        let v = value.trim().to_ascii_lowercase();
        let valid = v
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains('@'))
            .unwrap_or(false);
        if !valid || v.chars().any(char::is_whitespace) {
            return Err(invalid("email address"));
        }
        Ok(Self { kind: IdentityKind::Email, value: v })
    }

    /// An `http` or `https` URL.
    pub fn url(value: &str) -> Result<Self, VcError> {
        let v = value.trim();
        if !(v.starts_with("https://") || v.starts_with("http://")) || v.contains(char::is_whitespace) {
            return Err(invalid("URL"));
        }
        Ok(Self { kind: IdentityKind::Url, value: v.to_string() })
    }

    /// A `did:` identifier.
    pub fn did(value: &str) -> Result<Self, VcError> {
        let v = value.trim();
        let mut parts = v.splitn(3, ':');
        let ok = parts.next() == Some("did")
            && parts.next().is_some_and(|m| !m.is_empty())
            && parts.next().is_some_and(|id| !id.is_empty());
        if !ok {
            return Err(invalid("DID"));
        }
        Ok(Self { kind: IdentityKind::Did, value: v.to_string() })
    }

    /// Infer the kind from the value's shape. `mailto:` is stripped.
    pub fn parse(value: &str) -> Result<Self, VcError> {
        let v = value.trim();
        if v.is_empty() {
            return Err(VcError::IncompleteData("recipient identity"));
        }
        if let Some(addr) = v.strip_prefix("mailto:") {
            Self::email(addr)
        } else if v.starts_with("did:") {
            Self::did(v)
        } else if v.starts_with("http://") || v.starts_with("https://") {
            Self::url(v)
        } else {
            Self::email(v)
        }
    }

    /// Build an identity of a known kind.
    pub fn with_kind(kind: IdentityKind, value: &str) -> Result<Self, VcError> {
        match kind {
            IdentityKind::Email => Self::email(value),
            IdentityKind::Url => Self::url(value),
            IdentityKind::Did => Self::did(value),
        }
    }

    /// The identity kind.
    pub fn kind(&self) -> IdentityKind {
        self.kind
    }

    /// The normalized value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The IRI form used as an OB3 subject id.
    pub fn subject_id(&self) -> String {
        match self.kind {
            IdentityKind::Email => format!("mailto:{}", self.value),
            IdentityKind::Url | IdentityKind::Did => self.value.clone(),
        }
    }
}

/// A salted hash of an identity. Holds no plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedIdentity {
    kind: IdentityKind,
    identity_hash: String,
    salt: String,
}

impl HashedIdentity {
    /// Hash with a fresh random salt.
    pub fn new(identity: &RecipientIdentity) -> Self {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::with_salt(identity, &hex_encode(&salt))
    }

    /// Hash with a caller-chosen salt.
    pub fn with_salt(identity: &RecipientIdentity, salt: &str) -> Self {
        Self {
            kind: identity.kind,
            identity_hash: hash_identity(identity.value(), salt),
            salt: salt.to_string(),
        }
    }

    /// Kind of the hashed identity.
    pub fn kind(&self) -> IdentityKind {
        self.kind
    }

    /// `sha256$<hex>`.
    pub fn identity_hash(&self) -> &str {
        &self.identity_hash
    }

    /// The salt.
    pub fn salt(&self) -> &str {
        &self.salt
    }
}

/// Who a credential was awarded to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "lowercase")]
pub enum Recipient {
    /// The identity appears verbatim in documents.
    Plain(RecipientIdentity),
    /// Only the salted hash appears.
    Hashed(HashedIdentity),
}

impl Recipient {
    /// Wrap an identity, hashing it when `hashed` is set.
    pub fn new(identity: RecipientIdentity, hashed: bool) -> Self {
        if hashed {
            Self::Hashed(HashedIdentity::new(&identity))
        } else {
            Self::Plain(identity)
        }
    }

    /// Kind of the underlying identity.
    pub fn kind(&self) -> IdentityKind {
        match self {
            Self::Plain(id) => id.kind(),
            Self::Hashed(h) => h.kind(),
        }
    }

    /// Whether the plaintext is withheld.
    pub fn is_hashed(&self) -> bool {
        matches!(self, Self::Hashed(_))
    }
}

/// `sha256$` + hex SHA-256 of `identity` followed by `salt`.
pub fn hash_identity(identity: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{SHA256_PREFIX}{}", hex_encode(&hasher.finalize()))
}

/// Whether `claimed` identifies `recipient`.
///
/// The claim is normalized as the recipient's identity kind before
/// comparison, so `Alice@Example.com` matches a recipient hashed from
/// `alice@example.com`. Unsupported hash algorithms never match.
pub fn recipient_matches(recipient: &Recipient, claimed: &str) -> bool {
    let claimed = match RecipientIdentity::with_kind(recipient.kind(), claimed.trim_start_matches("mailto:")) {
        Ok(id) => id,
        Err(_) => return false,
    };
    match recipient {
        Recipient::Plain(id) => id.value() == claimed.value(),
        Recipient::Hashed(h) => {
            let Some(expected) = h.identity_hash().strip_prefix(SHA256_PREFIX) else {
                return false;
            };
            let computed = hash_identity(claimed.value(), h.salt());
            computed
                .strip_prefix(SHA256_PREFIX)
                .is_some_and(|hex| hex.eq_ignore_ascii_case(expected))
        }
    }
}

fn invalid(what: &str) -> VcError {
    VcError::InvalidField {
        field: "recipient",
        reason: format!("not a valid {what}"),
    }
}

//! # Open Badges 2.0 Documents
//!
//! Hosted JSON-LD: the assertion links to its BadgeClass, which links to
//! its Issuer profile, and verification is by fetching the assertion from
//! its own `id`. None of these documents carry a proof.

use ob_core::Timestamp;
use serde::{Deserialize, Serialize};

/// OB2 JSON-LD context.
pub const OB2_CONTEXT: &str = "https://w3id.org/openbadges/v2";

/// `recipient` of an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob2IdentityObject {
    /// `email`, `url`, or `id`.
    #[serde(rename = "type")]
    pub identity_type: String,
    /// Plaintext identity, or `sha256$<hex>`.
    pub identity: String,
    /// Whether `identity` is a hash.
    pub hashed: bool,
    /// Salt, for hashed identities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

/// `verification` of an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob2Verification {
    /// Always `HostedBadge`.
    #[serde(rename = "type")]
    pub verification_type: String,
}

/// An evidence entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob2Evidence {
    /// Always `Evidence`.
    #[serde(rename = "type")]
    pub evidence_type: String,
    /// Evidence IRI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Narrative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    /// Name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An OB2 `Assertion`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob2Assertion {
    /// [`OB2_CONTEXT`].
    #[serde(rename = "@context")]
    pub context: String,
    /// Always `Assertion`.
    #[serde(rename = "type")]
    pub assertion_type: String,
    /// Hosted IRI of this assertion.
    pub id: String,
    /// Recipient.
    pub recipient: Ob2IdentityObject,
    /// BadgeClass IRI.
    pub badge: String,
    /// Verification method.
    pub verification: Ob2Verification,
    /// Issuance time.
    #[serde(rename = "issuedOn")]
    pub issued_on: Timestamp,
    /// Expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<Timestamp>,
    /// Evidence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Ob2Evidence>,
    /// Award narrative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    /// Present and `true` only for revoked assertions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked: Option<bool>,
    /// Reason given at revocation.
    #[serde(rename = "revocationReason", default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
}

/// `criteria` of a BadgeClass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob2Criteria {
    /// External criteria page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Narrative.
    pub narrative: String,
}

/// An alignment entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ob2Alignment {
    /// Name.
    pub target_name: String,
    /// URL.
    pub target_url: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_description: Option<String>,
    /// Framework.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_framework: Option<String>,
    /// Code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_code: Option<String>,
}

/// An OB2 `BadgeClass`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob2BadgeClass {
    /// [`OB2_CONTEXT`].
    #[serde(rename = "@context")]
    pub context: String,
    /// Always `BadgeClass`.
    #[serde(rename = "type")]
    pub badge_type: String,
    /// Hosted IRI.
    pub id: String,
    /// Name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Image IRI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Criteria.
    pub criteria: Ob2Criteria,
    /// Issuer profile IRI.
    pub issuer: String,
    /// Alignments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alignment: Vec<Ob2Alignment>,
    /// Tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// An OB2 `Issuer` profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob2Issuer {
    /// [`OB2_CONTEXT`].
    #[serde(rename = "@context")]
    pub context: String,
    /// Always `Issuer`.
    #[serde(rename = "type")]
    pub issuer_type: String,
    /// Hosted IRI.
    pub id: String,
    /// Name.
    pub name: String,
    /// Homepage.
    pub url: String,
    /// Contact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Logo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

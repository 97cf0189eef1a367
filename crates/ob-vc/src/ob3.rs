//! # Open Badges 3.0 Credentials
//!
//! An `OpenBadgeCredential` is a W3C Verifiable Credential (data model v1)
//! whose subject holds the achievement. The `@context` and `type` arrays are
//! constants: the same logical credential must canonicalize to the same
//! bytes on every build.

use ob_core::Timestamp;
use ob_status::{StatusList2021Entry, CREDENTIALS_V1_CONTEXT, DATA_INTEGRITY_CONTEXT, STATUS_LIST_2021_CONTEXT};
use serde::{Deserialize, Serialize};

use crate::proof::DataIntegrityProof;

/// Open Badges 3.0 context.
pub const OB3_CONTEXT: &str = "https://purl.imsglobal.org/spec/ob/v3p0/context-3.0.3.json";

/// The `@context` of every OB3 credential, in order.
pub const OB3_CONTEXTS: [&str; 4] = [
    CREDENTIALS_V1_CONTEXT,
    OB3_CONTEXT,
    STATUS_LIST_2021_CONTEXT,
    DATA_INTEGRITY_CONTEXT,
];

/// The `type` of every OB3 credential.
pub const OB3_TYPES: [&str; 2] = ["VerifiableCredential", "OpenBadgeCredential"];

/// The issuer `Profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob3Profile {
    /// Profile IRI.
    pub id: String,
    /// Always `["Profile"]`.
    #[serde(rename = "type")]
    pub profile_type: Vec<String>,
    /// Name.
    pub name: String,
    /// Homepage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Contact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A hashed recipient identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ob3IdentityObject {
    /// Always `IdentityObject`.
    #[serde(rename = "type")]
    pub identity_object_type: String,
    /// `sha256$<hex>`.
    pub identity_hash: String,
    /// `emailAddress`, `ext:url`, or `ext:did`.
    pub identity_type: String,
    /// Always `true`.
    pub hashed: bool,
    /// Salt.
    pub salt: String,
}

/// `criteria` of an achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob3Criteria {
    /// External criteria page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Narrative.
    pub narrative: String,
}

/// An image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob3Image {
    /// Image IRI.
    pub id: String,
    /// Always `Image`.
    #[serde(rename = "type")]
    pub image_type: String,
}

/// An alignment entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ob3Alignment {
    /// Always `["Alignment"]`.
    #[serde(rename = "type")]
    pub alignment_type: Vec<String>,
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

/// The achievement inside the subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob3Achievement {
    /// Achievement IRI.
    pub id: String,
    /// Always `["Achievement"]`.
    #[serde(rename = "type")]
    pub achievement_type: Vec<String>,
    /// Name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Criteria.
    pub criteria: Ob3Criteria,
    /// Image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Ob3Image>,
    /// Alignments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alignment: Vec<Ob3Alignment>,
    /// Tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<String>,
}

/// `credentialSubject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob3Subject {
    /// Recipient IRI; absent when the recipient is hashed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Always `["AchievementSubject"]`.
    #[serde(rename = "type")]
    pub subject_type: Vec<String>,
    /// Hashed identifiers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Ob3IdentityObject>,
    /// The achievement.
    pub achievement: Ob3Achievement,
    /// Award narrative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

/// An evidence entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob3Evidence {
    /// Evidence IRI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Always `["Evidence"]`.
    #[serde(rename = "type")]
    pub evidence_type: Vec<String>,
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

/// An `OpenBadgeCredential`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ob3Credential {
    /// [`OB3_CONTEXTS`].
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// Credential IRI.
    pub id: String,
    /// [`OB3_TYPES`].
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,
    /// Issuer profile, embedded.
    pub issuer: Ob3Profile,
    /// Issuance time.
    #[serde(rename = "issuanceDate")]
    pub issuance_date: Timestamp,
    /// Expiry.
    #[serde(rename = "expirationDate", default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<Timestamp>,
    /// Achievement name, for display.
    pub name: String,
    /// Subject.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: Ob3Subject,
    /// Evidence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Ob3Evidence>,
    /// Status list entry.
    #[serde(rename = "credentialStatus", default, skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<StatusList2021Entry>,
    /// Data Integrity proof, once signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<DataIntegrityProof>,
}

impl Ob3Credential {
    /// Whether `@context` and `type` are the fixed OB3 values.
    pub fn has_fixed_envelope(&self) -> bool {
        self.context.iter().map(String::as_str).eq(OB3_CONTEXTS)
            && self.credential_type.iter().map(String::as_str).eq(OB3_TYPES)
    }
}

/// Owned copies of the fixed arrays.
pub(crate) fn fixed_contexts() -> Vec<String> {
    OB3_CONTEXTS.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn fixed_types() -> Vec<String> {
    OB3_TYPES.iter().map(|s| s.to_string()).collect()
}

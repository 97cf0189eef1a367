//! # Domain Records
//!
//! The internal state documents are built from. These are what the
//! repository stores; OB2 and OB3 documents are projections of them.

use ob_core::{AchievementId, CredentialId, IssuerId, Timestamp};
use ob_status::StatusListIndex;
use serde::{Deserialize, Serialize};

use crate::ob3::Ob3Credential;
use crate::recipient::Recipient;

/// An issuing organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    /// Identifier.
    pub id: IssuerId,
    /// Display name.
    pub name: String,
    /// The organization's public homepage.
    pub url: String,
    /// Contact address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Logo IRI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A framework alignment of an achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    /// Name of the aligned item.
    pub target_name: String,
    /// URL of the aligned item.
    pub target_url: String,
    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_description: Option<String>,
    /// Framework name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_framework: Option<String>,
    /// Code within the framework.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_code: Option<String>,
}

/// A badge definition, scoped to one issuer.
///
/// Treated as immutable once referenced by an assertion; an edit is a new
/// achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    /// Identifier.
    pub id: AchievementId,
    /// Owning issuer.
    pub issuer_id: IssuerId,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Badge image IRI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// What earning the badge requires.
    pub criteria_narrative: String,
    /// External criteria page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_url: Option<String>,
    /// Framework alignments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alignments: Vec<Alignment>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Supporting evidence for an award.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Evidence {
    /// Evidence IRI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Narrative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    /// Short name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Revocation details, present once revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    /// Why, if the issuer said.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When.
    pub revoked_at: Timestamp,
}

/// The central record: one award of one achievement to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionRecord {
    /// Identifier.
    pub id: CredentialId,
    /// Issuer.
    pub issuer_id: IssuerId,
    /// Achievement awarded.
    pub achievement_id: AchievementId,
    /// Recipient, plain or hashed.
    pub recipient: Recipient,
    /// Issuance time.
    pub issued_on: Timestamp,
    /// Expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<Timestamp>,
    /// Evidence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    /// Award narrative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    /// Status list position, once allocated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_index: Option<StatusListIndex>,
    /// Revocation details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation: Option<Revocation>,
    /// The signed OB3 credential. Written once at issuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_ob3: Option<Ob3Credential>,
}

impl AssertionRecord {
    /// A fresh, unsigned, unrevoked record.
    pub fn new(
        issuer_id: IssuerId,
        achievement_id: AchievementId,
        recipient: Recipient,
        issued_on: Timestamp,
    ) -> Self {
        Self {
            id: CredentialId::new(),
            issuer_id,
            achievement_id,
            recipient,
            issued_on,
            expires: None,
            evidence: Vec::new(),
            narrative: None,
            status_index: None,
            revocation: None,
            signed_ob3: None,
        }
    }

    /// Whether the record has been revoked.
    pub fn is_revoked(&self) -> bool {
        self.revocation.is_some()
    }
}

//! # StatusList2021 Wire Types
//!
//! [`StatusList2021Entry`] is the `credentialStatus` object embedded in an
//! issued credential. [`StatusListCredential`] is the published list it
//! points at. Both are plain serde types; signing the list credential is the
//! caller's job.

use ob_core::Timestamp;
use serde::{Deserialize, Serialize};

use crate::bitstring::Bitstring;
use crate::error::StatusError;
use crate::index::{StatusListIndex, StatusPurpose};

/// W3C Verifiable Credentials v1 context.
pub const CREDENTIALS_V1_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
/// StatusList2021 context.
pub const STATUS_LIST_2021_CONTEXT: &str = "https://w3id.org/vc/status-list/2021/v1";
/// Data Integrity context, needed once the list carries a proof.
pub const DATA_INTEGRITY_CONTEXT: &str = "https://w3id.org/security/data-integrity/v2";

/// The `credentialStatus` entry of an issued credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusList2021Entry {
    /// `<list url>#<index>`.
    pub id: String,
    /// Always `"StatusList2021Entry"`.
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Always `revocation`.
    #[serde(rename = "statusPurpose")]
    pub status_purpose: StatusPurpose,
    /// Bit offset within the list, as a decimal string.
    #[serde(rename = "statusListIndex")]
    pub status_list_index: String,
    /// URL of the list credential.
    #[serde(rename = "statusListCredential")]
    pub status_list_credential: String,
}

impl StatusList2021Entry {
    /// Entry for `index` on the page published at `list_url`.
    pub fn new(list_url: &str, index: StatusListIndex) -> Self {
        Self {
            id: format!("{list_url}#{}", index.offset),
            entry_type: "StatusList2021Entry".to_string(),
            status_purpose: StatusPurpose::Revocation,
            status_list_index: index.offset.to_string(),
            status_list_credential: list_url.to_string(),
        }
    }

    /// The bit offset, parsed.
    ///
    /// Only plain decimal digits without a sign or leading zeros are
    /// accepted, so each offset has exactly one spelling.
    pub fn offset(&self) -> Result<u32, StatusError> {
        let s = self.status_list_index.as_str();
        let canonical = !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && (s == "0" || !s.starts_with('0'));
        canonical.then(|| s.parse::<u32>().ok()).flatten().ok_or_else(|| {
            StatusError::Decoding(format!("statusListIndex {s:?} is not a canonical decimal offset"))
        })
    }
}

/// `credentialSubject` of a list credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusListSubject {
    /// `<list url>#list`.
    pub id: String,
    /// Always `"StatusList2021"`.
    #[serde(rename = "type")]
    pub subject_type: String,
    /// Always `revocation`.
    #[serde(rename = "statusPurpose")]
    pub status_purpose: StatusPurpose,
    /// GZIP + base64url bitstring.
    #[serde(rename = "encodedList")]
    pub encoded_list: String,
}

/// A `StatusList2021Credential`, without proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusListCredential {
    /// JSON-LD contexts.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// The list URL.
    pub id: String,
    /// `["VerifiableCredential", "StatusList2021Credential"]`.
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,
    /// Issuer profile IRI.
    pub issuer: String,
    /// When this snapshot was exported.
    #[serde(rename = "issuanceDate")]
    pub issuance_date: Timestamp,
    /// The encoded list.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: StatusListSubject,
}

impl StatusListCredential {
    /// Wrap an encoded bitstring.
    pub fn new(list_url: &str, issuer_url: &str, issued: Timestamp, bits: &Bitstring) -> Result<Self, StatusError> {
        Ok(Self {
            context: vec![
                CREDENTIALS_V1_CONTEXT.to_string(),
                STATUS_LIST_2021_CONTEXT.to_string(),
                DATA_INTEGRITY_CONTEXT.to_string(),
            ],
            id: list_url.to_string(),
            credential_type: vec![
                "VerifiableCredential".to_string(),
                "StatusList2021Credential".to_string(),
            ],
            issuer: issuer_url.to_string(),
            issuance_date: issued,
            credential_subject: StatusListSubject {
                id: format!("{list_url}#list"),
                subject_type: "StatusList2021".to_string(),
                status_purpose: StatusPurpose::Revocation,
                encoded_list: bits.encode()?,
            },
        })
    }

    /// Decode the embedded list.
    pub fn bitstring(&self) -> Result<Bitstring, StatusError> {
        Bitstring::decode(&self.credential_subject.encoded_list)
    }

    /// Offline check: is the bit named by `entry` set in this list?
    ///
    /// Fails if the entry points at a different list.
    pub fn is_set(&self, entry: &StatusList2021Entry) -> Result<bool, StatusError> {
        if entry.status_list_credential != self.id {
            return Err(StatusError::Decoding(format!(
                "entry references {} but this list is {}",
                entry.status_list_credential, self.id
            )));
        }
        self.bitstring()?.get(entry.offset()?)
    }
}

//! # Verification Pipeline
//!
//! Structural checks, then the proof, then revocation status, then expiry.
//! Each check is reported on its own; `None` means the check does not apply
//! or could not be reached.
//!
//! - **OB3**: the envelope must carry the fixed contexts and types; the
//!   `eddsa-jcs-2022` proof must verify against the key its
//!   `verificationMethod` names; the `credentialStatus` entry must point at
//!   a status list of the credential's own issuer hosted here, and its bit
//!   must be clear.
//! - **OB2**: hosted verification. There is no signature; the assertion must
//!   exist here and match the presented recipient and badge, and must not
//!   be revoked.
//!
//! Untrusted documents never produce an error, only a failing report.

use ob_core::{CredentialId, IssuerId, Timestamp};
use ob_status::{StatusList2021Entry, StatusListIndex};
use ob_vc::{sniff_format, CredentialFormat, Ob2Assertion, Ob3Credential, OB2_CONTEXT};
use serde::Serialize;
use serde_json::Value;

use crate::engine::CredentialEngine;
use crate::error::EngineError;

/// What to verify.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialRef {
    /// A credential stored here, verified as signed.
    Id(CredentialId),
    /// A presented document.
    Document(Value),
}

/// Per-check outcomes. `Some(true)` is a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerificationChecks {
    /// Shape, contexts and types.
    pub structure: Option<bool>,
    /// Data Integrity proof.
    pub signature: Option<bool>,
    /// Not revoked.
    pub revocation: Option<bool>,
    /// Not expired.
    pub expiration: Option<bool>,
}

/// Outcome of verifying one credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Overall verdict.
    pub valid: bool,
    /// `ob2` or `ob3`, if recognized.
    pub format: Option<&'static str>,
    /// The document's `id`.
    pub credential_id: Option<String>,
    /// Individual checks.
    pub checks: VerificationChecks,
    /// Key the proof named.
    pub verification_method: Option<String>,
    /// Why checks failed.
    pub errors: Vec<String>,
}

impl CredentialEngine {
    /// Verify a stored credential or a presented document.
    ///
    /// Fails only when an id names no stored credential.
    pub fn verify_credential(&self, target: CredentialRef) -> Result<VerificationReport, EngineError> {
        let _span = tracing::info_span!("verify_credential").entered();
        let report = match target {
            CredentialRef::Id(id) => {
                let record = self.repo.get_assertion(&id)?;
                match &record.signed_ob3 {
                    Some(signed) => self.verify_document(&serde_json::to_value(signed)?),
                    None => VerificationReport {
                        credential_id: Some(self.urls.credential(&id)),
                        checks: VerificationChecks {
                            structure: Some(false),
                            ..VerificationChecks::default()
                        },
                        errors: vec!["credential was never signed".into()],
                        ..VerificationReport::default()
                    },
                }
            }
            CredentialRef::Document(value) => self.verify_document(&value),
        };
        tracing::info!(
            valid = report.valid,
            format = report.format.unwrap_or("unknown"),
            structure = ?report.checks.structure,
            signature = ?report.checks.signature,
            revocation = ?report.checks.revocation,
            expiration = ?report.checks.expiration,
            "verified credential"
        );
        Ok(report)
    }

    /// Verify an untrusted JSON document.
    pub fn verify_document(&self, value: &Value) -> VerificationReport {
        let mut report = VerificationReport::default();
        match sniff_format(value) {
            Some(CredentialFormat::Ob3) => {
                report.format = Some(CredentialFormat::Ob3.as_str());
                self.verify_ob3(value, &mut report);
            }
            Some(CredentialFormat::Ob2) => {
                report.format = Some(CredentialFormat::Ob2.as_str());
                self.verify_ob2(value, &mut report);
            }
            None => {
                report.checks.structure = Some(false);
                report
                    .errors
                    .push("neither an OB2 assertion nor an OB3 credential".into());
            }
        }
        report
    }

    fn verify_ob3(&self, value: &Value, report: &mut VerificationReport) {
        let credential: Ob3Credential = match serde_json::from_value(value.clone()) {
            Ok(c) => c,
            Err(e) => {
                report.checks.structure = Some(false);
                report.errors.push(format!("malformed credential: {e}"));
                return;
            }
        };
        report.credential_id = Some(credential.id.clone());

        let structure = credential.has_fixed_envelope();
        if !structure {
            report.errors.push("unexpected @context or type".into());
        }
        report.checks.structure = Some(structure);

        let proof = self.proofs.verify(value);
        report.checks.signature = Some(proof.valid);
        report.verification_method = proof.verification_method.as_ref().map(ToString::to_string);
        if let Some(reason) = proof.reason() {
            report.errors.push(reason);
        }

        report.checks.revocation = credential
            .credential_status
            .as_ref()
            .map(|entry| self.status_bit_clear(entry, &credential.issuer.id, &mut report.errors));
        report.checks.expiration = Some(not_expired(credential.expiration_date, &mut report.errors));

        let checks = report.checks;
        report.valid = checks.structure == Some(true)
            && checks.signature == Some(true)
            && checks.revocation != Some(false)
            && checks.expiration != Some(false);
    }

    fn verify_ob2(&self, value: &Value, report: &mut VerificationReport) {
        let presented: Ob2Assertion = match serde_json::from_value(value.clone()) {
            Ok(a) => a,
            Err(e) => {
                report.checks.structure = Some(false);
                report.errors.push(format!("malformed assertion: {e}"));
                return;
            }
        };
        report.credential_id = Some(presented.id.clone());

        let structure = presented.context == OB2_CONTEXT && presented.verification.verification_type == "HostedBadge";
        if !structure {
            report.errors.push("unexpected @context or verification type".into());
        }
        report.checks.structure = Some(structure);

        let hosted = self
            .hosted_reference(&presented.id)
            .ok()
            .filter(|(format, _)| *format == CredentialFormat::Ob2)
            .and_then(|(_, id)| self.repo.get_assertion(&id).ok());
        let Some(record) = hosted else {
            report.errors.push(format!("{} is not hosted here", presented.id));
            return;
        };
        let authentic = match self.hosted_ob2(&record) {
            Ok(current) => current.recipient == presented.recipient && current.badge == presented.badge,
            Err(e) => {
                report.errors.push(e.to_string());
                false
            }
        };
        if !authentic {
            report.errors.push("assertion does not match the hosted copy".into());
        }

        let bit_clear = match record.status_index {
            Some(index) => match self.revocation.is_revoked(&record.issuer_id, index) {
                Ok(revoked) => !revoked,
                Err(e) => {
                    report.errors.push(e.to_string());
                    false
                }
            },
            None => true,
        };
        let not_revoked = bit_clear && !record.is_revoked();
        if !not_revoked {
            report.errors.push("assertion has been revoked".into());
        }
        report.checks.revocation = Some(not_revoked);
        report.checks.expiration = Some(not_expired(record.expires, &mut report.errors));

        let checks = report.checks;
        report.valid = structure && authentic && not_revoked && checks.expiration == Some(true);
    }

    /// Whether the entry's bit is clear. Anything unresolvable counts as a
    /// failure.
    fn status_bit_clear(&self, entry: &StatusList2021Entry, issuer_iri: &str, errors: &mut Vec<String>) -> bool {
        match self.locate_status_bit(entry, issuer_iri) {
            Ok((issuer, index)) => match self.revocation.is_revoked(&issuer, index) {
                Ok(false) => true,
                Ok(true) => {
                    errors.push("credential has been revoked".into());
                    false
                }
                Err(e) => {
                    errors.push(e.to_string());
                    false
                }
            },
            Err(e) => {
                errors.push(e);
                false
            }
        }
    }

    fn locate_status_bit(&self, entry: &StatusList2021Entry, issuer_iri: &str) -> Result<(IssuerId, StatusListIndex), String> {
        let list = &entry.status_list_credential;
        let prefix = format!("{}/status/", self.urls.base());
        let tail = list
            .strip_prefix(&prefix)
            .ok_or_else(|| format!("status list {list} is not hosted here"))?;
        let (issuer, page) = tail
            .split_once('/')
            .ok_or_else(|| format!("malformed status list IRI {list}"))?;
        let issuer = IssuerId::parse(issuer).map_err(|e| e.to_string())?;
        if self.urls.issuer(&issuer) != issuer_iri {
            return Err(format!("status list {list} belongs to another issuer"));
        }
        let page: u32 = page
            .parse()
            .map_err(|_| format!("malformed status list page in {list}"))?;
        let offset = entry.offset().map_err(|e| e.to_string())?;
        Ok((issuer, StatusListIndex { page, offset }))
    }
}

fn not_expired(expires: Option<Timestamp>, errors: &mut Vec<String>) -> bool {
    match expires {
        Some(at) if at < Timestamp::now() => {
            errors.push(format!("expired at {}", at.to_iso8601()));
            false
        }
        _ => true,
    }
}

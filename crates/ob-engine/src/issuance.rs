//! # Issuance Pipeline
//!
//! `issue_credential` runs: load records, build, allocate a status list
//! index, sign the OB3 credential, optionally bake, persist. The OB2 form is
//! an unsigned hosted projection of the same record.
//!
//! Revocation, retrieval, baking of existing credentials, extraction and the
//! signed status list export sit alongside, since they read or mutate the
//! same records.
//!
//! ## Invariants
//!
//! - Input is validated by a trial build before an index is consumed.
//! - A credential is persisted only after signing (and baking, if asked)
//!   succeeded, so no stored record lacks its proof.
//! - Revocation flips the status bit first and then marks the record; a
//!   retry after a partial failure completes the second step.

use ob_bake::{BakeError, EmbeddedPayload, ImageFormat};
use ob_core::{AchievementId, CredentialId, IssuerId, Timestamp};
use ob_status::{RevokeOutcome, StatusListIndex};
use ob_vc::{
    build_ob2, build_ob3, sniff_format, AssertionRecord, CredentialDocument, CredentialFormat, Evidence,
    IdentityKind, Ob2Assertion, Ob3Credential, Recipient, RecipientIdentity, Revocation,
};
use serde_json::Value;

use crate::auth::{AuthContext, SCOPE_CREDENTIAL_READONLY, SCOPE_CREDENTIAL_UPSERT};
use crate::engine::CredentialEngine;
use crate::error::EngineError;

/// Input to [`CredentialEngine::issue_credential`].
#[derive(Clone)]
pub struct IssueRequest {
    /// Issuer.
    pub issuer_id: IssuerId,
    /// Achievement awarded.
    pub achievement_id: AchievementId,
    /// Email, URL or DID of the recipient.
    pub recipient: String,
    /// Force the identity kind instead of inferring it.
    pub recipient_kind: Option<IdentityKind>,
    /// Hash the recipient. Defaults to `hash_recipients` from config.
    pub hashed: Option<bool>,
    /// Defaults to now.
    pub issued_on: Option<Timestamp>,
    /// Expiry.
    pub expires: Option<Timestamp>,
    /// Evidence.
    pub evidence: Vec<Evidence>,
    /// Award narrative.
    pub narrative: Option<String>,
    /// PNG or SVG to bake the signed credential into.
    pub bake_into: Option<Vec<u8>>,
}

impl IssueRequest {
    /// A request with every optional field unset.
    pub fn new(issuer_id: IssuerId, achievement_id: AchievementId, recipient: impl Into<String>) -> Self {
        Self {
            issuer_id,
            achievement_id,
            recipient: recipient.into(),
            recipient_kind: None,
            hashed: None,
            issued_on: None,
            expires: None,
            evidence: Vec::new(),
            narrative: None,
            bake_into: None,
        }
    }
}

impl std::fmt::Debug for IssueRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueRequest")
            .field("issuer_id", &self.issuer_id)
            .field("achievement_id", &self.achievement_id)
            .field("recipient", &"[REDACTED]")
            .field("recipient_kind", &self.recipient_kind)
            .field("hashed", &self.hashed)
            .field("issued_on", &self.issued_on)
            .field("expires", &self.expires)
            .field("bake_into", &self.bake_into.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

/// Result of issuance.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedCredential {
    /// Record id.
    pub credential_id: CredentialId,
    /// Position in the issuer's status list.
    pub status_index: StatusListIndex,
    /// Hosted OB2 assertion.
    pub ob2: Ob2Assertion,
    /// Signed OB3 credential.
    pub ob3: Ob3Credential,
    /// The baked image, if one was supplied.
    pub baked_image: Option<Vec<u8>>,
}

/// Result of revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevocationReceipt {
    /// Record id.
    pub credential_id: CredentialId,
    /// Always true on success.
    pub revoked: bool,
    /// Whether an earlier call had already revoked it.
    pub already_revoked: bool,
    /// The unchanged status list position.
    pub status_index: StatusListIndex,
}

/// A credential recovered from a baked image.
///
/// `document` is the JSON exactly as embedded (or as resolved from a hosted
/// reference), so a proof over it still verifies. Badges from other issuers
/// are returned too; they simply have no local record.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedCredential {
    /// The document's own `id`, verbatim.
    pub document_id: String,
    /// Local record id, when the document is hosted by this engine.
    pub credential_id: Option<CredentialId>,
    /// The document, unmodified.
    pub document: Value,
    /// Representation judged by `type`, if recognised.
    pub format: Option<CredentialFormat>,
    /// Container it came from.
    pub image_format: ImageFormat,
    /// Whether the image held only a hosted URL.
    pub from_reference: bool,
}

impl ExtractedCredential {
    /// Typed view of the document. Fields the typed model does not carry
    /// are dropped, so verify against [`document`](Self::document) instead.
    pub fn typed(&self) -> Result<CredentialDocument, EngineError> {
        Ok(CredentialDocument::from_value(self.document.clone())?)
    }
}

impl CredentialEngine {
    /// Issue a credential: build, allocate status, sign, optionally bake, persist.
    pub fn issue_credential(
        &self,
        auth: &AuthContext,
        request: IssueRequest,
    ) -> Result<IssuedCredential, EngineError> {
        let _span = tracing::info_span!(
            "issue_credential",
            principal = %auth.principal,
            issuer = %request.issuer_id,
            achievement = %request.achievement_id,
        )
        .entered();
        auth.require_scope(SCOPE_CREDENTIAL_UPSERT)?;

        let issuer = self.repo.get_issuer(&request.issuer_id)?;
        let achievement = self.repo.get_achievement(&request.achievement_id)?;

        let identity = match request.recipient_kind {
            Some(kind) => RecipientIdentity::with_kind(kind, &request.recipient)?,
            None => RecipientIdentity::parse(&request.recipient)?,
        };
        let hashed = request.hashed.unwrap_or(self.config.hash_recipients);
        let issued_on = request.issued_on.unwrap_or_else(Timestamp::now);
        if let Some(expires) = request.expires {
            if expires <= issued_on {
                return Err(EngineError::InvalidRequest(
                    "expiry must be after issuance".into(),
                ));
            }
        }

        let mut record = AssertionRecord::new(issuer.id, achievement.id, Recipient::new(identity, hashed), issued_on);
        record.expires = request.expires;
        record.evidence = request.evidence;
        record.narrative = request.narrative;

        build_ob3(&record, Some(&issuer), Some(&achievement), &self.urls)?;
        let status_index = self.revocation.allocate_index(&issuer.id)?;
        record.status_index = Some(status_index);

        let unsigned = build_ob3(&record, Some(&issuer), Some(&achievement), &self.urls)?;
        let signed = self.proofs.sign_credential(&unsigned, &issuer.id, Timestamp::now())?;

        let baked_image = match &request.bake_into {
            Some(image) => Some(ob_bake::bake(image, &serde_json::to_value(&signed)?, None)?),
            None => None,
        };

        record.signed_ob3 = Some(signed.clone());
        let ob2 = build_ob2(&record, Some(&issuer), Some(&achievement), &self.urls)?;
        self.repo.persist_assertion(&record)?;

        tracing::info!(
            credential = %record.id,
            status_index = %status_index,
            hashed,
            baked = baked_image.is_some(),
            "issued credential"
        );
        Ok(IssuedCredential {
            credential_id: record.id,
            status_index,
            ob2,
            ob3: signed,
            baked_image,
        })
    }

    /// Fetch a credential in either representation.
    ///
    /// OB2 is rebuilt from the current record, so it reflects revocation.
    /// OB3 is the credential exactly as signed.
    pub fn get_credential(
        &self,
        auth: &AuthContext,
        id: &CredentialId,
        format: CredentialFormat,
    ) -> Result<CredentialDocument, EngineError> {
        auth.require_scope(SCOPE_CREDENTIAL_READONLY)?;
        let record = self.repo.get_assertion(id)?;
        self.render(&record, format)
    }

    /// The public hosted OB2 assertion.
    pub fn hosted_assertion(&self, id: &CredentialId) -> Result<Ob2Assertion, EngineError> {
        let record = self.repo.get_assertion(id)?;
        self.hosted_ob2(&record)
    }

    /// Revoke a credential. Revoking twice succeeds and changes nothing.
    pub fn revoke_credential(
        &self,
        auth: &AuthContext,
        id: &CredentialId,
        reason: Option<String>,
    ) -> Result<RevocationReceipt, EngineError> {
        let _span = tracing::info_span!("revoke_credential", principal = %auth.principal, credential = %id).entered();
        auth.require_scope(SCOPE_CREDENTIAL_UPSERT)?;

        let mut record = self.repo.get_assertion(id)?;
        let status_index = record
            .status_index
            .ok_or_else(|| inconsistent(id, "no status list index"))?;
        let outcome = self
            .revocation
            .revoke(&record.issuer_id, status_index, reason.as_deref())?;

        if record.revocation.is_none() {
            record.revocation = Some(Revocation {
                reason,
                revoked_at: Timestamp::now(),
            });
            self.repo.persist_assertion(&record)?;
        }

        Ok(RevocationReceipt {
            credential_id: record.id,
            revoked: true,
            already_revoked: outcome == RevokeOutcome::AlreadyRevoked,
            status_index,
        })
    }

    /// Bake the signed OB3 credential into an image.
    pub fn bake_badge(
        &self,
        auth: &AuthContext,
        image: &[u8],
        id: &CredentialId,
    ) -> Result<Vec<u8>, EngineError> {
        let _span = tracing::info_span!("bake_badge", principal = %auth.principal, credential = %id).entered();
        auth.require_scope(SCOPE_CREDENTIAL_READONLY)?;
        let record = self.repo.get_assertion(id)?;
        let signed = record
            .signed_ob3
            .as_ref()
            .ok_or_else(|| inconsistent(id, "no signed credential"))?;
        Ok(ob_bake::bake(image, &serde_json::to_value(signed)?, None)?)
    }

    /// Bake only the hosted OB2 assertion URL into an image.
    pub fn bake_hosted_badge(
        &self,
        auth: &AuthContext,
        image: &[u8],
        id: &CredentialId,
    ) -> Result<Vec<u8>, EngineError> {
        let _span = tracing::info_span!("bake_hosted_badge", principal = %auth.principal, credential = %id).entered();
        auth.require_scope(SCOPE_CREDENTIAL_READONLY)?;
        let record = self.repo.get_assertion(id)?;
        Ok(ob_bake::bake_reference(image, &self.urls.assertion(&record.id), None)?)
    }

    /// Recover the credential from a baked image.
    ///
    /// An embedded document is returned as found, without verification,
    /// whoever issued it. A hosted URL is resolved through the repository
    /// and must point at this engine's base URL.
    pub fn extract_badge(&self, image: &[u8]) -> Result<ExtractedCredential, EngineError> {
        let _span = tracing::info_span!("extract_badge", bytes = image.len()).entered();
        let badge = ob_bake::extract(image)?;

        let (credential_id, document, from_reference) = match badge.payload {
            EmbeddedPayload::Document(value) => {
                let local = value
                    .get("id")
                    .and_then(Value::as_str)
                    .and_then(|iri| self.hosted_reference(iri).ok())
                    .map(|(_, id)| id);
                (local, value, false)
            }
            EmbeddedPayload::Reference(url) => {
                let (format, id) = self.hosted_reference(&url)?;
                let record = self.repo.get_assertion(&id)?;
                (Some(id), self.render(&record, format)?.to_value()?, true)
            }
        };
        let document_id = document
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| BakeError::InvalidPayload("embedded document has no string id".into()))?
            .to_string();
        let format = sniff_format(&document);
        tracing::debug!(
            document = %document_id,
            local = credential_id.is_some(),
            format = format.as_ref().map(CredentialFormat::as_str).unwrap_or("unknown"),
            from_reference,
            "extracted credential"
        );
        Ok(ExtractedCredential {
            document_id,
            credential_id,
            document,
            format,
            image_format: badge.format,
            from_reference,
        })
    }

    /// Export one page of the issuer's status list as a signed
    /// `StatusList2021Credential`.
    pub fn status_list_credential(&self, issuer_id: &IssuerId, page: u32) -> Result<Value, EngineError> {
        let _span = tracing::info_span!("status_list_credential", issuer = %issuer_id, page).entered();
        let issuer = self.repo.get_issuer(issuer_id)?;
        let list = self.revocation.export_status_list(
            &issuer.id,
            page,
            &self.urls.status_list(&issuer.id, page),
            &self.urls.issuer(&issuer.id),
        )?;
        Ok(self.proofs.sign(&serde_json::to_value(&list)?, &issuer.id)?)
    }

    pub(crate) fn render(
        &self,
        record: &AssertionRecord,
        format: CredentialFormat,
    ) -> Result<CredentialDocument, EngineError> {
        match format {
            CredentialFormat::Ob2 => Ok(CredentialDocument::Ob2(self.hosted_ob2(record)?)),
            CredentialFormat::Ob3 => {
                let signed = record
                    .signed_ob3
                    .clone()
                    .ok_or_else(|| inconsistent(&record.id, "no signed credential"))?;
                Ok(CredentialDocument::Ob3(Box::new(signed)))
            }
        }
    }

    pub(crate) fn hosted_ob2(&self, record: &AssertionRecord) -> Result<Ob2Assertion, EngineError> {
        let issuer = self.repo.get_issuer(&record.issuer_id)?;
        let achievement = self.repo.get_achievement(&record.achievement_id)?;
        Ok(build_ob2(record, Some(&issuer), Some(&achievement), &self.urls)?)
    }

    /// Map a hosted assertion or credential IRI back to its record id.
    pub(crate) fn hosted_reference(&self, iri: &str) -> Result<(CredentialFormat, CredentialId), EngineError> {
        let base = self.urls.base();
        let tail = iri
            .strip_prefix(base)
            .ok_or_else(|| EngineError::InvalidRequest(format!("{iri} is not hosted under {base}")))?;
        let (format, id) = if let Some(id) = tail.strip_prefix("/assertions/") {
            (CredentialFormat::Ob2, id)
        } else if let Some(id) = tail.strip_prefix("/credentials/") {
            (CredentialFormat::Ob3, id)
        } else {
            return Err(EngineError::InvalidRequest(format!("{iri} is not a credential IRI")));
        };
        Ok((format, CredentialId::parse(id)?))
    }
}

fn inconsistent(id: &CredentialId, reason: &str) -> EngineError {
    EngineError::InconsistentRecord {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

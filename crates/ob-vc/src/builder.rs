//! # Credential Builder
//!
//! Maps domain records to OB2 and OB3 documents. The mapping is total and
//! deterministic: every required field has a source, optional fields
//! (expiry, evidence, alignment, tags, narrative, image) appear only when
//! present on the record, and nothing is ever emitted as `null`.
//!
//! Recipient hashing is decided when the record is created
//! ([`Recipient::new`]) so that OB2 and OB3 projections of one assertion
//! share one salt. A hashed recipient contributes no plaintext to any
//! document built here.

use ob_status::StatusList2021Entry;

use crate::error::VcError;
use crate::ob2::{
    Ob2Alignment, Ob2Assertion, Ob2BadgeClass, Ob2Criteria, Ob2Evidence, Ob2IdentityObject,
    Ob2Issuer, Ob2Verification, OB2_CONTEXT,
};
use crate::ob3::{
    fixed_contexts, fixed_types, Ob3Achievement, Ob3Alignment, Ob3Credential, Ob3Criteria,
    Ob3Evidence, Ob3IdentityObject, Ob3Image, Ob3Profile, Ob3Subject,
};
use crate::recipient::Recipient;
use crate::records::{Achievement, AssertionRecord, Issuer};
use crate::urls::HostedUrls;

/// Build the hosted OB2 assertion.
///
/// The `revoked` and `revocationReason` fields appear only on revoked
/// records.
pub fn build_ob2(
    assertion: &AssertionRecord,
    issuer: Option<&Issuer>,
    achievement: Option<&Achievement>,
    urls: &HostedUrls,
) -> Result<Ob2Assertion, VcError> {
    let (_, achievement) = resolve(assertion, issuer, achievement)?;

    let recipient = match &assertion.recipient {
        Recipient::Plain(id) => Ob2IdentityObject {
            identity_type: id.kind().ob2_type().to_string(),
            identity: id.value().to_string(),
            hashed: false,
            salt: None,
        },
        Recipient::Hashed(h) => Ob2IdentityObject {
            identity_type: h.kind().ob2_type().to_string(),
            identity: h.identity_hash().to_string(),
            hashed: true,
            salt: Some(h.salt().to_string()),
        },
    };

    Ok(Ob2Assertion {
        context: OB2_CONTEXT.to_string(),
        assertion_type: "Assertion".to_string(),
        id: urls.assertion(&assertion.id),
        recipient,
        badge: urls.badge_class(&achievement.id),
        verification: Ob2Verification {
            verification_type: "HostedBadge".to_string(),
        },
        issued_on: assertion.issued_on,
        expires: assertion.expires,
        evidence: assertion
            .evidence
            .iter()
            .map(|e| Ob2Evidence {
                evidence_type: "Evidence".to_string(),
                id: e.id.clone(),
                narrative: e.narrative.clone(),
                name: e.name.clone(),
                description: e.description.clone(),
            })
            .collect(),
        narrative: assertion.narrative.clone(),
        revoked: assertion.revocation.as_ref().map(|_| true),
        revocation_reason: assertion.revocation.as_ref().and_then(|r| r.reason.clone()),
    })
}

/// Build the unsigned OB3 credential.
///
/// `credentialStatus` is present once the record has a status list index.
pub fn build_ob3(
    assertion: &AssertionRecord,
    issuer: Option<&Issuer>,
    achievement: Option<&Achievement>,
    urls: &HostedUrls,
) -> Result<Ob3Credential, VcError> {
    let (issuer, achievement) = resolve(assertion, issuer, achievement)?;

    let (subject_id, identifier) = match &assertion.recipient {
        Recipient::Plain(id) => (Some(id.subject_id()), Vec::new()),
        Recipient::Hashed(h) => (
            None,
            vec![Ob3IdentityObject {
                identity_object_type: "IdentityObject".to_string(),
                identity_hash: h.identity_hash().to_string(),
                identity_type: h.kind().ob3_identity_type().to_string(),
                hashed: true,
                salt: h.salt().to_string(),
            }],
        ),
    };

    let ob3_achievement = Ob3Achievement {
        id: urls.badge_class(&achievement.id),
        achievement_type: vec!["Achievement".to_string()],
        name: achievement.name.clone(),
        description: achievement.description.clone(),
        criteria: Ob3Criteria {
            id: achievement.criteria_url.clone(),
            narrative: achievement.criteria_narrative.clone(),
        },
        image: achievement.image.as_ref().map(|iri| Ob3Image {
            id: iri.clone(),
            image_type: "Image".to_string(),
        }),
        alignment: achievement
            .alignments
            .iter()
            .map(|a| Ob3Alignment {
                alignment_type: vec!["Alignment".to_string()],
                target_name: a.target_name.clone(),
                target_url: a.target_url.clone(),
                target_description: a.target_description.clone(),
                target_framework: a.target_framework.clone(),
                target_code: a.target_code.clone(),
            })
            .collect(),
        tag: achievement.tags.clone(),
    };

    Ok(Ob3Credential {
        context: fixed_contexts(),
        id: urls.credential(&assertion.id),
        credential_type: fixed_types(),
        issuer: Ob3Profile {
            id: urls.issuer(&issuer.id),
            profile_type: vec!["Profile".to_string()],
            name: issuer.name.clone(),
            url: Some(issuer.url.clone()),
            email: issuer.email.clone(),
        },
        issuance_date: assertion.issued_on,
        expiration_date: assertion.expires,
        name: achievement.name.clone(),
        credential_subject: Ob3Subject {
            id: subject_id,
            subject_type: vec!["AchievementSubject".to_string()],
            identifier,
            achievement: ob3_achievement,
            narrative: assertion.narrative.clone(),
        },
        evidence: assertion
            .evidence
            .iter()
            .map(|e| Ob3Evidence {
                id: e.id.clone(),
                evidence_type: vec!["Evidence".to_string()],
                narrative: e.narrative.clone(),
                name: e.name.clone(),
                description: e.description.clone(),
            })
            .collect(),
        credential_status: assertion.status_index.map(|index| {
            StatusList2021Entry::new(&urls.status_list(&assertion.issuer_id, index.page), index)
        }),
        proof: None,
    })
}

/// Build the hosted OB2 BadgeClass an assertion's `badge` points at.
pub fn build_ob2_badge_class(achievement: &Achievement, urls: &HostedUrls) -> Result<Ob2BadgeClass, VcError> {
    require_text(&achievement.name, "achievement name")?;
    Ok(Ob2BadgeClass {
        context: OB2_CONTEXT.to_string(),
        badge_type: "BadgeClass".to_string(),
        id: urls.badge_class(&achievement.id),
        name: achievement.name.clone(),
        description: achievement.description.clone(),
        image: achievement.image.clone(),
        criteria: Ob2Criteria {
            id: achievement.criteria_url.clone(),
            narrative: achievement.criteria_narrative.clone(),
        },
        issuer: urls.issuer(&achievement.issuer_id),
        alignment: achievement
            .alignments
            .iter()
            .map(|a| Ob2Alignment {
                target_name: a.target_name.clone(),
                target_url: a.target_url.clone(),
                target_description: a.target_description.clone(),
                target_framework: a.target_framework.clone(),
                target_code: a.target_code.clone(),
            })
            .collect(),
        tags: achievement.tags.clone(),
    })
}

/// Build the hosted OB2 Issuer profile.
pub fn build_ob2_issuer(issuer: &Issuer, urls: &HostedUrls) -> Result<Ob2Issuer, VcError> {
    require_text(&issuer.name, "issuer name")?;
    Ok(Ob2Issuer {
        context: OB2_CONTEXT.to_string(),
        issuer_type: "Issuer".to_string(),
        id: urls.issuer(&issuer.id),
        name: issuer.name.clone(),
        url: issuer.url.clone(),
        email: issuer.email.clone(),
        description: issuer.description.clone(),
        image: issuer.image.clone(),
    })
}

/// Check that the issuer and achievement are present and belong to the assertion.
fn resolve<'a>(
    assertion: &AssertionRecord,
    issuer: Option<&'a Issuer>,
    achievement: Option<&'a Achievement>,
) -> Result<(&'a Issuer, &'a Achievement), VcError> {
    let issuer = issuer.ok_or(VcError::IncompleteData("issuer"))?;
    let achievement = achievement.ok_or(VcError::IncompleteData("achievement"))?;
    require_text(&issuer.name, "issuer name")?;
    require_text(&achievement.name, "achievement name")?;

    if issuer.id != assertion.issuer_id {
        return Err(VcError::Inconsistent(format!(
            "assertion {} names issuer {}, got {}",
            assertion.id, assertion.issuer_id, issuer.id
        )));
    }
    if achievement.id != assertion.achievement_id {
        return Err(VcError::Inconsistent(format!(
            "assertion {} names achievement {}, got {}",
            assertion.id, assertion.achievement_id, achievement.id
        )));
    }
    if achievement.issuer_id != issuer.id {
        return Err(VcError::Inconsistent(format!(
            "achievement {} belongs to issuer {}",
            achievement.id, achievement.issuer_id
        )));
    }
    Ok((issuer, achievement))
}

fn require_text(value: &str, field: &'static str) -> Result<(), VcError> {
    if value.trim().is_empty() {
        return Err(VcError::IncompleteData(field));
    }
    Ok(())
}

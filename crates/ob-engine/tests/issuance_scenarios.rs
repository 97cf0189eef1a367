//! # Issuance, Revocation and Baking Scenarios
//!
//! End-to-end runs through `CredentialEngine` with in-memory collaborators.

mod common;

use std::sync::Arc;

use common::{one_pixel_png, world, world_with, ONE_PIXEL_SVG};
use ob_bake::{BakeError, ImageFormat};
use ob_core::ErrorClass;
use ob_crypto::KeyProvider;
use ob_engine::{
    AuthContext, CredentialRef, EngineConfig, EngineError, IssueRequest, SCOPE_CREDENTIAL_READONLY,
};
use ob_status::StatusListCredential;
use ob_vc::{
    hash_identity, recipient_matches, CredentialDocument, CredentialFormat, ProofEngine, Recipient,
};
use serde_json::{json, Value};

#[test]
fn alice_receives_a_signed_ob3_credential() {
    let w = world();
    let issued = w
        .engine
        .issue_credential(&w.admin, IssueRequest::new(w.issuer, w.achievement, "alice@example.com"))
        .unwrap();

    let ob3 = serde_json::to_value(&issued.ob3).unwrap();
    assert_eq!(ob3["credentialSubject"]["id"], "mailto:alice@example.com");
    assert_eq!(ob3["credentialSubject"]["achievement"]["name"], "Test Badge");
    assert_eq!(ob3["proof"]["type"], "DataIntegrityProof");
    assert_eq!(ob3["proof"]["cryptosuite"], "eddsa-jcs-2022");
    assert_eq!(ob3["proof"]["proofPurpose"], "assertionMethod");
    assert!(ob3["proof"]["proofValue"].as_str().unwrap().starts_with('z'));
    assert_eq!(ob3["credentialStatus"]["statusPurpose"], "revocation");

    let ob2 = serde_json::to_value(&issued.ob2).unwrap();
    assert_eq!(ob2["type"], "Assertion");
    assert_eq!(ob2["recipient"]["identity"], "alice@example.com");
    assert_eq!(ob2["verification"]["type"], "HostedBadge");
    assert!(ob2.get("revoked").is_none());
}

#[test]
fn png_bake_then_extract_returns_the_same_document() {
    let w = world();
    let mut request = IssueRequest::new(w.issuer, w.achievement, "alice@example.com");
    request.bake_into = Some(one_pixel_png());
    let issued = w.engine.issue_credential(&w.admin, request).unwrap();

    let baked = issued.baked_image.clone().unwrap();
    let extracted = w.engine.extract_badge(&baked).unwrap();
    assert_eq!(extracted.image_format, ImageFormat::Png);
    assert_eq!(extracted.credential_id, Some(issued.credential_id));
    assert_eq!(extracted.document_id, issued.ob3.id);
    assert!(!extracted.from_reference);
    assert_eq!(extracted.document, serde_json::to_value(&issued.ob3).unwrap());
    assert!(w.engine.verify_document(&extracted.document).valid);

    let rebaked = w
        .engine
        .bake_badge(&w.admin, &one_pixel_png(), &issued.credential_id)
        .unwrap();
    assert_eq!(rebaked, baked);
}

#[test]
fn svg_bake_then_extract_returns_the_same_document() {
    let w = world();
    let issued = w
        .engine
        .issue_credential(&w.admin, IssueRequest::new(w.issuer, w.achievement, "alice@example.com"))
        .unwrap();
    let baked = w
        .engine
        .bake_badge(&w.admin, ONE_PIXEL_SVG.as_bytes(), &issued.credential_id)
        .unwrap();
    let text = String::from_utf8(baked.clone()).unwrap();
    assert!(text.contains(&format!(r#"verify="{}""#, issued.ob3.id)));

    let extracted = w.engine.extract_badge(&baked).unwrap();
    assert_eq!(extracted.image_format, ImageFormat::Svg);
    assert_eq!(extracted.format, Some(CredentialFormat::Ob3));
    assert_eq!(
        extracted.typed().unwrap(),
        CredentialDocument::Ob3(Box::new(issued.ob3.clone()))
    );
}

#[test]
fn hosted_reference_is_resolved_through_the_repository() {
    let w = world();
    let issued = w
        .engine
        .issue_credential(&w.admin, IssueRequest::new(w.issuer, w.achievement, "alice@example.com"))
        .unwrap();
    let baked = w
        .engine
        .bake_hosted_badge(&w.admin, &one_pixel_png(), &issued.credential_id)
        .unwrap();

    w.engine
        .revoke_credential(&w.admin, &issued.credential_id, Some("duplicate".into()))
        .unwrap();
    let extracted = w.engine.extract_badge(&baked).unwrap();
    assert!(extracted.from_reference);
    assert_eq!(extracted.credential_id, Some(issued.credential_id));
    match extracted.typed().unwrap() {
        CredentialDocument::Ob2(ob2) => {
            assert_eq!(ob2.revoked, Some(true));
            assert_eq!(ob2.revocation_reason.as_deref(), Some("duplicate"));
        }
        other => panic!("expected OB2, got {:?}", other.format()),
    }
}

#[test]
fn extraction_keeps_fields_the_typed_model_does_not_know() {
    let w = world();
    let issued = w
        .engine
        .issue_credential(&w.admin, IssueRequest::new(w.issuer, w.achievement, "alice@example.com"))
        .unwrap();

    // Re-sign with the issuer's own key after adding fields the engine never emits.
    let mut doc = serde_json::to_value(&issued.ob3).unwrap();
    doc["description"] = json!("Awarded at the spring workshop.");
    doc["termsOfUse"] = json!([{"type": "TrustFrameworkPolicy", "id": "https://acme.example/terms"}]);
    let keys: Arc<dyn KeyProvider> = w.engine.keyring().clone();
    let signed = ProofEngine::new(keys).sign(&doc, &w.issuer).unwrap();

    for image in [one_pixel_png(), ONE_PIXEL_SVG.as_bytes().to_vec()] {
        let baked = ob_bake::bake(&image, &signed, None).unwrap();
        let extracted = w.engine.extract_badge(&baked).unwrap();
        assert_eq!(extracted.document, signed);
        assert_eq!(extracted.credential_id, Some(issued.credential_id));

        let report = w.engine.verify_document(&extracted.document);
        assert!(report.valid, "{:?}", report.errors);

        let narrowed = extracted.typed().unwrap().to_value().unwrap();
        assert!(narrowed.get("description").is_none());
        assert_eq!(w.engine.verify_document(&narrowed).checks.signature, Some(false));
    }
}

#[test]
fn badges_from_other_issuers_are_extracted_without_a_local_record() {
    let w = world();
    let foreign = json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "id": "https://other.example/credentials/abc",
        "type": ["VerifiableCredential", "OpenBadgeCredential"],
        "issuer": {"id": "https://other.example/issuers/1", "type": ["Profile"], "name": "Other"},
        "issuanceDate": "2025-06-30T09:00:00Z",
        "credentialSubject": {"type": ["AchievementSubject"]}
    });
    for image in [one_pixel_png(), ONE_PIXEL_SVG.as_bytes().to_vec()] {
        let baked = ob_bake::bake(&image, &foreign, None).unwrap();
        let extracted = w.engine.extract_badge(&baked).unwrap();
        assert_eq!(extracted.document, foreign);
        assert_eq!(extracted.document_id, "https://other.example/credentials/abc");
        assert_eq!(extracted.credential_id, None);
        assert_eq!(extracted.format, Some(CredentialFormat::Ob3));
        assert!(!extracted.from_reference);
        assert!(!w.engine.verify_document(&extracted.document).valid);
    }

    let anonymous = ob_bake::bake(&one_pixel_png(), &json!({"name": "no id"}), None).unwrap();
    let err = w.engine.extract_badge(&anonymous).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Format);
}

#[test]
fn extracting_from_an_unbaked_image_is_not_found() {
    let w = world();
    for image in [one_pixel_png(), ONE_PIXEL_SVG.as_bytes().to_vec()] {
        let err = w.engine.extract_badge(&image).unwrap_err();
        assert!(matches!(err, EngineError::Bake(BakeError::NotFound)));
        assert_eq!(err.class(), ErrorClass::NotFound);
    }
    let err = w.engine.extract_badge(b"GIF89a").unwrap_err();
    assert_eq!(err.class(), ErrorClass::Format);
}

#[test]
fn revoked_credential_keeps_a_valid_signature_but_fails() {
    let w = world();
    let issued = w
        .engine
        .issue_credential(&w.admin, IssueRequest::new(w.issuer, w.achievement, "alice@example.com"))
        .unwrap();
    w.engine
        .revoke_credential(&w.admin, &issued.credential_id, Some("issued in error".into()))
        .unwrap();

    let report = w
        .engine
        .verify_credential(CredentialRef::Id(issued.credential_id))
        .unwrap();
    assert!(!report.valid);
    assert_eq!(report.checks.signature, Some(true));
    assert_eq!(report.checks.revocation, Some(false));

    let presented = serde_json::to_value(&issued.ob3).unwrap();
    let report = w.engine.verify_credential(CredentialRef::Document(presented)).unwrap();
    assert!(!report.valid);
    assert_eq!(report.checks.signature, Some(true));
    assert_eq!(report.checks.revocation, Some(false));
}

#[test]
fn revoke_is_idempotent_and_keeps_the_index() {
    let w = world();
    let issued = w
        .engine
        .issue_credential(&w.admin, IssueRequest::new(w.issuer, w.achievement, "alice@example.com"))
        .unwrap();
    let first = w
        .engine
        .revoke_credential(&w.admin, &issued.credential_id, None)
        .unwrap();
    let second = w
        .engine
        .revoke_credential(&w.admin, &issued.credential_id, None)
        .unwrap();
    assert!(first.revoked && second.revoked);
    assert!(!first.already_revoked && second.already_revoked);
    assert_eq!(first.status_index, issued.status_index);
    assert_eq!(second.status_index, issued.status_index);
}

#[test]
fn rotated_key_still_verifies_earlier_credentials() {
    let w = world();
    let before = w
        .engine
        .issue_credential(&w.admin, IssueRequest::new(w.issuer, w.achievement, "alice@example.com"))
        .unwrap();
    let new_key = w.engine.rotate_issuer_key(&w.admin, &w.issuer).unwrap();
    let after = w
        .engine
        .issue_credential(&w.admin, IssueRequest::new(w.issuer, w.achievement, "bob@example.com"))
        .unwrap();

    let old = w.engine.verify_credential(CredentialRef::Id(before.credential_id)).unwrap();
    assert!(old.valid, "{:?}", old.errors);
    assert!(old.verification_method.unwrap().ends_with("#key-1"));

    let new = w.engine.verify_credential(CredentialRef::Id(after.credential_id)).unwrap();
    assert!(new.valid);
    assert_eq!(new.verification_method.as_deref(), Some(new_key.as_str()));
}

#[test]
fn hashed_recipient_never_appears_in_any_artifact() {
    let w = world_with(EngineConfig {
        host_base_url: "https://badges.example.org".into(),
        hash_recipients: true,
        ..EngineConfig::default()
    });
    let mut request = IssueRequest::new(w.issuer, w.achievement, "alice@example.com");
    request.bake_into = Some(ONE_PIXEL_SVG.as_bytes().to_vec());
    let issued = w.engine.issue_credential(&w.admin, request).unwrap();

    let ob2 = serde_json::to_string(&issued.ob2).unwrap();
    let ob3 = serde_json::to_string(&issued.ob3).unwrap();
    let baked = String::from_utf8(issued.baked_image.clone().unwrap()).unwrap();
    for artifact in [&ob2, &ob3, &baked] {
        assert!(!artifact.contains("alice"), "plaintext leaked: {artifact}");
    }

    let subject = &issued.ob3.credential_subject;
    assert!(subject.id.is_none());
    let identifier = &subject.identifier[0];
    assert!(identifier.hashed);
    assert_eq!(identifier.identity_type, "emailAddress");
    assert_eq!(
        identifier.identity_hash,
        hash_identity("alice@example.com", &identifier.salt)
    );
    assert_eq!(issued.ob2.recipient.salt.as_deref(), Some(identifier.salt.as_str()));

    let stored = w
        .engine
        .get_credential(&w.admin, &issued.credential_id, CredentialFormat::Ob2)
        .unwrap();
    assert!(!serde_json::to_string(&stored.to_value().unwrap()).unwrap().contains("alice"));

    let report = w
        .engine
        .verify_credential(CredentialRef::Id(issued.credential_id))
        .unwrap();
    assert!(report.valid);

    let recipient = Recipient::new(ob_vc::RecipientIdentity::email("alice@example.com").unwrap(), true);
    assert!(recipient_matches(&recipient, "alice@example.com"));
}

#[test]
fn signed_status_list_reflects_revocations() {
    let w = world();
    let keep = w
        .engine
        .issue_credential(&w.admin, IssueRequest::new(w.issuer, w.achievement, "alice@example.com"))
        .unwrap();
    let drop = w
        .engine
        .issue_credential(&w.admin, IssueRequest::new(w.issuer, w.achievement, "bob@example.com"))
        .unwrap();
    w.engine.revoke_credential(&w.admin, &drop.credential_id, None).unwrap();

    let signed = w.engine.status_list_credential(&w.issuer, 0).unwrap();
    assert_eq!(signed["proof"]["type"], "DataIntegrityProof");
    assert_eq!(signed["id"], w.engine.urls().status_list(&w.issuer, 0));

    let mut unsigned = signed.clone();
    unsigned.as_object_mut().unwrap().remove("proof");
    let list: StatusListCredential = serde_json::from_value(unsigned).unwrap();
    assert!(!list.is_set(keep.ob3.credential_status.as_ref().unwrap()).unwrap());
    assert!(list.is_set(drop.ob3.credential_status.as_ref().unwrap()).unwrap());

    assert!(w.engine.status_list_credential(&w.issuer, 7).is_err());
}

#[test]
fn readers_can_fetch_and_bake_but_not_mutate() {
    let w = world();
    let issued = w
        .engine
        .issue_credential(&w.admin, IssueRequest::new(w.issuer, w.achievement, "alice@example.com"))
        .unwrap();
    let reader = AuthContext::new("wallet", [SCOPE_CREDENTIAL_READONLY]);

    let doc = w
        .engine
        .get_credential(&reader, &issued.credential_id, CredentialFormat::Ob3)
        .unwrap();
    assert_eq!(doc.format(), CredentialFormat::Ob3);
    assert!(w
        .engine
        .bake_badge(&reader, &one_pixel_png(), &issued.credential_id)
        .is_ok());

    let err = w
        .engine
        .revoke_credential(&reader, &issued.credential_id, None)
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Forbidden);
}

#[test]
fn issuer_profile_lists_verification_methods() {
    let w = world();
    w.engine.rotate_issuer_key(&w.admin, &w.issuer).unwrap();
    let methods = w.engine.issuer_keys(&w.issuer).unwrap();
    let json: Vec<Value> = methods
        .iter()
        .map(|m| serde_json::to_value(m).unwrap())
        .collect();
    assert_eq!(json.len(), 2);
    for method in json {
        assert_eq!(method["type"], "Multikey");
        assert_eq!(method["controller"], w.engine.urls().issuer(&w.issuer));
    }
}

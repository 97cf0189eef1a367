//! # Data Integrity Proofs (`eddsa-jcs-2022`)
//!
//! Signs and verifies credential documents with Ed25519 over JCS-canonical
//! bytes.
//!
//! ## Algorithm
//!
//! 1. Remove any existing `proof` from the document.
//! 2. Build the proof configuration: the proof object without `proofValue`,
//!    carrying the document's `@context`.
//! 3. Hash data = `SHA-256(JCS(config)) || SHA-256(JCS(document))`.
//! 4. `proofValue` = multibase base58-btc of the Ed25519 signature.
//!
//! ## Security Invariants
//!
//! - Signing always produces a new document. A proof is never edited in
//!   place; re-signing discards the old one.
//! - Verification never returns an error for untrusted input. Every failure
//!   becomes a [`VerificationResult`] with `valid = false` and a
//!   [`ProofFailure`] saying why.
//! - Public keys are resolved by the proof's `verificationMethod`, never by
//!   "the issuer's current key", so rotation does not break old proofs.

use std::sync::Arc;

use ob_core::{CanonicalBytes, IssuerId, KeyId, Timestamp};
use ob_crypto::{Ed25519Signature, KeyProvider, SigningInput};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::VcError;
use crate::ob3::Ob3Credential;

/// Proof `type`.
pub const DATA_INTEGRITY_PROOF: &str = "DataIntegrityProof";

/// The only cryptosuite produced or accepted.
pub const CRYPTOSUITE: &str = "eddsa-jcs-2022";

/// The purpose of a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    /// The issuer asserts the claims.
    AssertionMethod,
}

/// A Data Integrity proof object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIntegrityProof {
    /// [`DATA_INTEGRITY_PROOF`].
    #[serde(rename = "type")]
    pub proof_type: String,
    /// [`CRYPTOSUITE`].
    pub cryptosuite: String,
    /// Signing time.
    pub created: Timestamp,
    /// Key id of the signing key.
    #[serde(rename = "verificationMethod")]
    pub verification_method: KeyId,
    /// Always `assertionMethod`.
    #[serde(rename = "proofPurpose")]
    pub proof_purpose: ProofPurpose,
    /// Multibase signature.
    #[serde(rename = "proofValue")]
    pub proof_value: String,
}

/// Why a proof did not verify.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofFailure {
    /// The document has no `proof`.
    #[error("document has no proof")]
    MissingProof,

    /// The document or proof is structurally unusable.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// Proof type or cryptosuite is not `DataIntegrityProof`/`eddsa-jcs-2022`.
    #[error("unsupported proof: {0}")]
    UnsupportedProof(String),

    /// No key is known under the verification method.
    #[error("cannot resolve verification method: {0}")]
    UnresolvableKey(String),

    /// The document cannot be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    /// The signature does not match the document.
    #[error("signature does not match document")]
    SignatureMismatch,

    /// The proof claims to postdate the credential's expiry.
    #[error("proof created {created} after credential expired {expiration}")]
    CreatedAfterExpiration {
        /// Proof `created`.
        created: String,
        /// Document `expirationDate`.
        expiration: String,
    },
}

/// Outcome of verifying one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    /// Whether the proof is valid.
    pub valid: bool,
    /// Set iff `valid` is false.
    pub failure: Option<ProofFailure>,
    /// The key the proof named, if it could be read.
    pub verification_method: Option<KeyId>,
}

impl VerificationResult {
    fn ok(key_id: KeyId) -> Self {
        Self {
            valid: true,
            failure: None,
            verification_method: Some(key_id),
        }
    }

    fn fail(failure: ProofFailure, key_id: Option<KeyId>) -> Self {
        Self {
            valid: false,
            failure: Some(failure),
            verification_method: key_id,
        }
    }

    /// Human-readable failure reason.
    pub fn reason(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}

/// Signs with keys from a [`KeyProvider`] and verifies against it.
#[derive(Clone)]
pub struct ProofEngine {
    keys: Arc<dyn KeyProvider>,
}

impl ProofEngine {
    /// Wrap a key provider.
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self { keys }
    }

    /// The key provider.
    pub fn keys(&self) -> &Arc<dyn KeyProvider> {
        &self.keys
    }

    /// Sign with the issuer's current key, timestamped now.
    pub fn sign(&self, document: &Value, issuer: &IssuerId) -> Result<Value, VcError> {
        self.sign_at(document, issuer, Timestamp::now())
    }

    /// Sign with the issuer's current key and an explicit `created`.
    ///
    /// # Errors
    ///
    /// `Crypto` if the issuer has no signing key (a misconfiguration),
    /// `Canonicalization` if the document holds non-integer numbers.
    pub fn sign_at(&self, document: &Value, issuer: &IssuerId, created: Timestamp) -> Result<Value, VcError> {
        let mut unsigned = match document {
            Value::Object(map) => map.clone(),
            _ => {
                return Err(VcError::InvalidField {
                    field: "document",
                    reason: "not a JSON object".into(),
                })
            }
        };
        unsigned.remove("proof");

        let key = self.keys.signing_key(issuer)?;
        let mut proof = Map::new();
        proof.insert("type".into(), Value::String(DATA_INTEGRITY_PROOF.into()));
        proof.insert("cryptosuite".into(), Value::String(CRYPTOSUITE.into()));
        proof.insert("created".into(), Value::String(created.to_iso8601()));
        proof.insert("verificationMethod".into(), Value::String(key.key_id().to_string()));
        proof.insert("proofPurpose".into(), Value::String("assertionMethod".into()));

        let config = proof_config(unsigned.get("@context"), &proof);
        let input = SigningInput::new(
            &CanonicalBytes::from_value(config)?,
            &CanonicalBytes::from_value(Value::Object(unsigned.clone()))?,
        );
        let signature = key.sign(&input);
        proof.insert("proofValue".into(), Value::String(signature.to_multibase()));
        unsigned.insert("proof".into(), Value::Object(proof));

        tracing::debug!(issuer = %issuer, verification_method = %key.key_id(), "signed document");
        Ok(Value::Object(unsigned))
    }

    /// Sign a typed OB3 credential, returning a new signed copy.
    pub fn sign_credential(
        &self,
        credential: &Ob3Credential,
        issuer: &IssuerId,
        created: Timestamp,
    ) -> Result<Ob3Credential, VcError> {
        let signed = self.sign_at(&serde_json::to_value(credential)?, issuer, created)?;
        Ok(serde_json::from_value(signed)?)
    }

    /// Verify the document's proof.
    pub fn verify(&self, document: &Value) -> VerificationResult {
        let Some(doc) = document.as_object() else {
            return VerificationResult::fail(
                ProofFailure::MalformedProof("document is not a JSON object".into()),
                None,
            );
        };
        let Some(raw_proof) = doc.get("proof") else {
            return VerificationResult::fail(ProofFailure::MissingProof, None);
        };
        let Some(proof_map) = raw_proof.as_object() else {
            return VerificationResult::fail(
                ProofFailure::MalformedProof("proof is not a single JSON object".into()),
                None,
            );
        };
        let proof: DataIntegrityProof = match serde_json::from_value(raw_proof.clone()) {
            Ok(p) => p,
            Err(e) => {
                return VerificationResult::fail(ProofFailure::MalformedProof(e.to_string()), None)
            }
        };
        let key_id = proof.verification_method.clone();
        let fail = |failure| VerificationResult::fail(failure, Some(key_id.clone()));

        if proof.proof_type != DATA_INTEGRITY_PROOF || proof.cryptosuite != CRYPTOSUITE {
            return fail(ProofFailure::UnsupportedProof(format!(
                "{}/{}",
                proof.proof_type, proof.cryptosuite
            )));
        }
        let signature = match Ed25519Signature::from_multibase(&proof.proof_value) {
            Ok(s) => s,
            Err(e) => return fail(ProofFailure::MalformedProof(e.to_string())),
        };
        let public_key = match self.keys.resolve_public_key(&proof.verification_method) {
            Ok(pk) => pk,
            Err(e) => return fail(ProofFailure::UnresolvableKey(e.to_string())),
        };

        let mut unsigned = doc.clone();
        unsigned.remove("proof");
        let config = proof_config(doc.get("@context"), proof_map);
        let input = match (
            CanonicalBytes::from_value(config),
            CanonicalBytes::from_value(Value::Object(unsigned)),
        ) {
            (Ok(c), Ok(d)) => SigningInput::new(&c, &d),
            (Err(e), _) | (_, Err(e)) => return fail(ProofFailure::Canonicalization(e.to_string())),
        };
        if public_key.verify(&input, &signature).is_err() {
            return fail(ProofFailure::SignatureMismatch);
        }

        if let Some(raw_exp) = doc.get("expirationDate") {
            let expiration = match raw_exp.as_str().map(Timestamp::parse_lenient) {
                Some(Ok(t)) => t,
                _ => return fail(ProofFailure::MalformedProof("unreadable expirationDate".into())),
            };
            if proof.created > expiration {
                return fail(ProofFailure::CreatedAfterExpiration {
                    created: proof.created.to_iso8601(),
                    expiration: expiration.to_iso8601(),
                });
            }
        }

        VerificationResult::ok(key_id)
    }
}

impl std::fmt::Debug for ProofEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofEngine")
            .field("keys", &self.keys.provider_name())
            .finish()
    }
}

/// The proof object minus `proofValue`, with the document's `@context`.
fn proof_config(context: Option<&Value>, proof: &Map<String, Value>) -> Value {
    let mut config = proof.clone();
    config.remove("proofValue");
    if let Some(ctx) = context {
        config.insert("@context".into(), ctx.clone());
    }
    Value::Object(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ob_crypto::Keyring;
    use proptest::prelude::*;
    use serde_json::json;

    const CONTROLLER: &str = "https://badges.example.com/issuers/acme";

    fn setup() -> (Arc<Keyring>, ProofEngine, IssuerId) {
        let ring = Arc::new(Keyring::new());
        let issuer = IssuerId::new();
        ring.generate_key(&issuer, CONTROLLER).unwrap();
        let engine = ProofEngine::new(ring.clone());
        (ring, engine, issuer)
    }

    fn doc() -> Value {
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "id": "https://badges.example.com/credentials/1",
            "type": ["VerifiableCredential", "OpenBadgeCredential"],
            "name": "Test Badge",
            "issuanceDate": "2024-01-01T00:00:00Z",
            "credentialSubject": {"id": "mailto:alice@example.com"}
        })
    }

    fn created() -> Timestamp {
        Timestamp::parse("2024-01-01T00:00:00Z").unwrap()
    }

    #[test]
    fn sign_then_verify() {
        let (_, engine, issuer) = setup();
        let signed = engine.sign_at(&doc(), &issuer, created()).unwrap();

        let proof = &signed["proof"];
        assert_eq!(proof["type"], "DataIntegrityProof");
        assert_eq!(proof["cryptosuite"], "eddsa-jcs-2022");
        assert_eq!(proof["proofPurpose"], "assertionMethod");
        assert_eq!(proof["verificationMethod"], format!("{CONTROLLER}#key-1"));
        assert!(proof["proofValue"].as_str().unwrap().starts_with('z'));

        let result = engine.verify(&signed);
        assert!(result.valid, "{:?}", result.reason());
        assert_eq!(result.verification_method.unwrap().fragment(), "key-1");
    }

    #[test]
    fn signing_is_deterministic_for_fixed_created() {
        let (_, engine, issuer) = setup();
        let a = engine.sign_at(&doc(), &issuer, created()).unwrap();
        let b = engine.sign_at(&doc(), &issuer, created()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn resigning_replaces_the_proof() {
        let (ring, engine, issuer) = setup();
        let first = engine.sign_at(&doc(), &issuer, created()).unwrap();
        ring.rotate(&issuer, CONTROLLER).unwrap();
        let second = engine.sign_at(&first, &issuer, created()).unwrap();
        assert!(second["proof"].get("proof").is_none());
        assert_eq!(second["proof"]["verificationMethod"], format!("{CONTROLLER}#key-2"));
        assert!(engine.verify(&second).valid);
        assert_ne!(first["proof"], second["proof"]);
    }

    #[test]
    fn tampered_field_fails() {
        let (_, engine, issuer) = setup();
        let mut signed = engine.sign_at(&doc(), &issuer, created()).unwrap();
        signed["name"] = json!("Forged Badge");
        let result = engine.verify(&signed);
        assert!(!result.valid);
        assert_eq!(result.failure, Some(ProofFailure::SignatureMismatch));
    }

    #[test]
    fn tampered_proof_config_fails() {
        let (_, engine, issuer) = setup();
        let mut signed = engine.sign_at(&doc(), &issuer, created()).unwrap();
        signed["proof"]["created"] = json!("2030-01-01T00:00:00Z");
        assert_eq!(engine.verify(&signed).failure, Some(ProofFailure::SignatureMismatch));
    }

    #[test]
    fn missing_and_malformed_proofs() {
        let (_, engine, issuer) = setup();
        assert_eq!(engine.verify(&doc()).failure, Some(ProofFailure::MissingProof));
        assert!(matches!(
            engine.verify(&json!([1, 2])).failure,
            Some(ProofFailure::MalformedProof(_))
        ));

        let mut signed = engine.sign_at(&doc(), &issuer, created()).unwrap();
        signed["proof"]["proofValue"] = json!("not-multibase");
        assert!(matches!(engine.verify(&signed).failure, Some(ProofFailure::MalformedProof(_))));

        let mut other_suite = engine.sign_at(&doc(), &issuer, created()).unwrap();
        other_suite["proof"]["cryptosuite"] = json!("ecdsa-rdfc-2019");
        assert!(matches!(
            engine.verify(&other_suite).failure,
            Some(ProofFailure::UnsupportedProof(_))
        ));
    }

    #[test]
    fn unknown_key_is_unresolvable() {
        let (_, engine, issuer) = setup();
        let signed = engine.sign_at(&doc(), &issuer, created()).unwrap();
        let stranger = ProofEngine::new(Arc::new(Keyring::new()));
        assert!(matches!(
            stranger.verify(&signed).failure,
            Some(ProofFailure::UnresolvableKey(_))
        ));
    }

    #[test]
    fn rotated_key_still_verifies_old_documents() {
        let (ring, engine, issuer) = setup();
        let signed = engine.sign_at(&doc(), &issuer, created()).unwrap();
        ring.rotate(&issuer, CONTROLLER).unwrap();
        ring.rotate(&issuer, CONTROLLER).unwrap();
        assert!(engine.verify(&signed).valid);
    }

    #[test]
    fn created_after_expiration_fails() {
        let (_, engine, issuer) = setup();
        let mut d = doc();
        d["expirationDate"] = json!("2023-06-01T00:00:00Z");
        let signed = engine.sign_at(&d, &issuer, created()).unwrap();
        assert!(matches!(
            engine.verify(&signed).failure,
            Some(ProofFailure::CreatedAfterExpiration { .. })
        ));

        d["expirationDate"] = json!("2025-06-01T00:00:00Z");
        let signed = engine.sign_at(&d, &issuer, created()).unwrap();
        assert!(engine.verify(&signed).valid);
    }

    #[test]
    fn missing_signing_key_is_an_error_not_a_result() {
        let (_, engine, _) = setup();
        let err = engine.sign(&doc(), &IssuerId::new()).unwrap_err();
        assert!(matches!(err, VcError::Crypto(_)));
    }

    #[test]
    fn floats_cannot_be_signed() {
        let (_, engine, issuer) = setup();
        let mut d = doc();
        d["score"] = json!(0.5);
        assert!(matches!(
            engine.sign(&d, &issuer),
            Err(VcError::Canonicalization(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn flipping_a_canonical_byte_breaks_the_proof(
            name in "[a-zA-Z0-9 ]{1,16}",
            note in "[a-z]{0,8}",
            pos in any::<prop::sample::Index>(),
        ) {
            let (_, engine, issuer) = setup();
            let mut d = doc();
            d["name"] = json!(name);
            d["note"] = json!(note);
            let signed = engine.sign_at(&d, &issuer, created()).unwrap();

            let mut unsigned = signed.clone();
            let proof = unsigned.as_object_mut().unwrap().remove("proof").unwrap();
            let mut bytes = CanonicalBytes::from_value(unsigned).unwrap().as_bytes().to_vec();
            let i = pos.index(bytes.len());
            bytes[i] ^= 0x01;

            let tampered: Value = match std::str::from_utf8(&bytes).ok().and_then(|s| serde_json::from_str(s).ok()) {
                Some(v @ Value::Object(_)) => v,
                _ => return Ok(()),
            };
            let mut tampered = tampered;
            tampered["proof"] = proof;
            prop_assert!(!engine.verify(&tampered).valid);
        }
    }
}

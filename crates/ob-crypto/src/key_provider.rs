//! # Key Provider Abstraction
//!
//! The proof engine never holds key material. It asks a [`KeyProvider`] for
//! an issuer's current [`SigningKeyHandle`] when signing, and resolves a
//! public key by [`KeyId`] when verifying.
//!
//! - [`Keyring`]: in-memory keys per issuer, with rotation. Every key it has
//!   ever issued stays resolvable.
//! - [`CachingKeyResolver`]: wraps any provider and caches public keys by
//!   key id. Entries are never evicted on rotation, since old credentials
//!   still name the old key.
//!
//! ## Security Invariants
//!
//! - `KeyProvider` is `Send + Sync` for use across worker threads.
//! - Private keys never leave the provider except behind an `Arc` inside a
//!   handle whose `Debug` output is redacted.

use std::collections::HashMap;
use std::sync::Arc;

use ob_core::{IssuerId, KeyId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, SigningInput};
use crate::error::CryptoError;

/// Source of signing keys and resolver of verification keys.
pub trait KeyProvider: Send + Sync {
    /// The issuer's current signing key.
    ///
    /// `NoSigningKey` here is an internal misconfiguration and aborts the
    /// issuance.
    fn signing_key(&self, issuer: &IssuerId) -> Result<SigningKeyHandle, CryptoError>;

    /// Resolve any key this provider has ever issued, current or rotated.
    fn resolve_public_key(&self, key_id: &KeyId) -> Result<Ed25519PublicKey, CryptoError>;

    /// Human-readable name for diagnostics.
    fn provider_name(&self) -> &str;
}

/// A usable signing key: its id, its public half, and a signer.
#[derive(Clone)]
pub struct SigningKeyHandle {
    key_id: KeyId,
    public_key: Ed25519PublicKey,
    signer: Arc<Ed25519KeyPair>,
}

impl SigningKeyHandle {
    /// Bundle a key pair with the id it is published under.
    pub fn new(key_id: KeyId, signer: Arc<Ed25519KeyPair>) -> Self {
        Self {
            public_key: signer.public_key(),
            key_id,
            signer,
        }
    }

    /// The verification method reference for proofs made with this key.
    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    /// The public key.
    pub fn public_key(&self) -> &Ed25519PublicKey {
        &self.public_key
    }

    /// Sign a proof's hash data.
    pub fn sign(&self, input: &SigningInput) -> Ed25519Signature {
        self.signer.sign(input)
    }
}

impl std::fmt::Debug for SigningKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyHandle")
            .field("key_id", &self.key_id)
            .field("public_key", &self.public_key)
            .field("signer", &"<private>")
            .finish()
    }
}

/// A Multikey verification method, as published in an issuer profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMethod {
    /// The key id.
    pub id: KeyId,
    /// Always `"Multikey"`.
    #[serde(rename = "type")]
    pub method_type: String,
    /// The controlling issuer profile.
    pub controller: String,
    /// Multibase-encoded public key.
    #[serde(rename = "publicKeyMultibase")]
    pub public_key_multibase: String,
}

#[derive(Default)]
struct KeyringState {
    /// Per issuer, every key ever registered, oldest first. The last one is current.
    by_issuer: HashMap<IssuerId, Vec<KeyId>>,
    keys: HashMap<KeyId, Arc<Ed25519KeyPair>>,
}

/// In-memory key store with rotation.
#[derive(Default)]
pub struct Keyring {
    state: RwLock<KeyringState>,
}

impl Keyring {
    /// An empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh key for `issuer` under `controller` and make it current.
    pub fn generate_key(&self, issuer: &IssuerId, controller: &str) -> Result<KeyId, CryptoError> {
        self.insert(issuer, controller, Ed25519KeyPair::generate())
    }

    /// Register an existing key pair for `issuer` and make it current.
    pub fn import_key(
        &self,
        issuer: &IssuerId,
        controller: &str,
        key: Ed25519KeyPair,
    ) -> Result<KeyId, CryptoError> {
        self.insert(issuer, controller, key)
    }

    /// Replace the issuer's current key with a new one.
    ///
    /// The previous key remains resolvable by its id.
    pub fn rotate(&self, issuer: &IssuerId, controller: &str) -> Result<KeyId, CryptoError> {
        let previous = self.current_key_id(issuer);
        let key_id = self.generate_key(issuer, controller)?;
        tracing::info!(
            issuer = %issuer,
            previous = previous.as_ref().map(KeyId::as_str).unwrap_or("<none>"),
            current = %key_id,
            "rotated issuer signing key"
        );
        Ok(key_id)
    }

    /// The issuer's current key id, if any.
    pub fn current_key_id(&self, issuer: &IssuerId) -> Option<KeyId> {
        self.state
            .read()
            .by_issuer
            .get(issuer)
            .and_then(|ids| ids.last().cloned())
    }

    /// Every key id ever registered for the issuer, oldest first.
    pub fn key_ids(&self, issuer: &IssuerId) -> Vec<KeyId> {
        self.state
            .read()
            .by_issuer
            .get(issuer)
            .cloned()
            .unwrap_or_default()
    }

    /// Multikey descriptors for every key of the issuer.
    pub fn verification_methods(&self, issuer: &IssuerId) -> Vec<VerificationMethod> {
        let state = self.state.read();
        state
            .by_issuer
            .get(issuer)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| {
                        state.keys.get(id).map(|kp| VerificationMethod {
                            id: id.clone(),
                            method_type: "Multikey".to_string(),
                            controller: id.controller().to_string(),
                            public_key_multibase: kp.public_key().to_multibase(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn insert(
        &self,
        issuer: &IssuerId,
        controller: &str,
        key: Ed25519KeyPair,
    ) -> Result<KeyId, CryptoError> {
        let mut state = self.state.write();
        let ordinal = state.by_issuer.get(issuer).map(Vec::len).unwrap_or(0) + 1;
        let key_id = KeyId::new(controller, &format!("key-{ordinal}"))
            .map_err(|e| CryptoError::KeyMaterial(e.to_string()))?;
        if state.keys.contains_key(&key_id) {
            return Err(CryptoError::KeyMaterial(format!("key id {key_id} already registered")));
        }
        state.keys.insert(key_id.clone(), Arc::new(key));
        state
            .by_issuer
            .entry(*issuer)
            .or_default()
            .push(key_id.clone());
        Ok(key_id)
    }
}

impl KeyProvider for Keyring {
    fn signing_key(&self, issuer: &IssuerId) -> Result<SigningKeyHandle, CryptoError> {
        let state = self.state.read();
        let key_id = state
            .by_issuer
            .get(issuer)
            .and_then(|ids| ids.last())
            .ok_or_else(|| CryptoError::NoSigningKey(issuer.to_string()))?;
        let key = state
            .keys
            .get(key_id)
            .ok_or_else(|| CryptoError::NoSigningKey(issuer.to_string()))?;
        Ok(SigningKeyHandle::new(key_id.clone(), Arc::clone(key)))
    }

    fn resolve_public_key(&self, key_id: &KeyId) -> Result<Ed25519PublicKey, CryptoError> {
        self.state
            .read()
            .keys
            .get(key_id)
            .map(|kp| kp.public_key())
            .ok_or_else(|| CryptoError::UnknownKey(key_id.to_string()))
    }

    fn provider_name(&self) -> &str {
        "Keyring"
    }
}

impl<P: KeyProvider + ?Sized> KeyProvider for Arc<P> {
    fn signing_key(&self, issuer: &IssuerId) -> Result<SigningKeyHandle, CryptoError> {
        (**self).signing_key(issuer)
    }

    fn resolve_public_key(&self, key_id: &KeyId) -> Result<Ed25519PublicKey, CryptoError> {
        (**self).resolve_public_key(key_id)
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }
}

/// Caches resolved public keys by key id in front of another provider.
pub struct CachingKeyResolver<P> {
    inner: P,
    cache: RwLock<HashMap<KeyId, Ed25519PublicKey>>,
}

impl<P: KeyProvider> CachingKeyResolver<P> {
    /// Wrap a provider.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of cached keys.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }
}

impl<P: KeyProvider> KeyProvider for CachingKeyResolver<P> {
    fn signing_key(&self, issuer: &IssuerId) -> Result<SigningKeyHandle, CryptoError> {
        let handle = self.inner.signing_key(issuer)?;
        self.cache
            .write()
            .entry(handle.key_id().clone())
            .or_insert(*handle.public_key());
        Ok(handle)
    }

    fn resolve_public_key(&self, key_id: &KeyId) -> Result<Ed25519PublicKey, CryptoError> {
        if let Some(pk) = self.cache.read().get(key_id) {
            return Ok(*pk);
        }
        let pk = self.inner.resolve_public_key(key_id)?;
        self.cache.write().insert(key_id.clone(), pk);
        Ok(pk)
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ob_core::CanonicalBytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CONTROLLER: &str = "https://badges.example.com/issuers/acme";

    fn signing_input() -> SigningInput {
        let c = CanonicalBytes::new(&serde_json::json!({"c": 1})).unwrap();
        let d = CanonicalBytes::new(&serde_json::json!({"d": 2})).unwrap();
        SigningInput::new(&c, &d)
    }

    #[test]
    fn keyring_sign_and_resolve() {
        let ring = Keyring::new();
        let issuer = IssuerId::new();
        let key_id = ring.generate_key(&issuer, CONTROLLER).unwrap();
        assert_eq!(key_id.as_str(), format!("{CONTROLLER}#key-1"));

        let handle = ring.signing_key(&issuer).unwrap();
        assert_eq!(handle.key_id(), &key_id);
        let sig = handle.sign(&signing_input());
        let pk = ring.resolve_public_key(&key_id).unwrap();
        pk.verify(&signing_input(), &sig).unwrap();
    }

    #[test]
    fn missing_issuer_key_is_misconfiguration() {
        let ring = Keyring::new();
        assert!(matches!(
            ring.signing_key(&IssuerId::new()),
            Err(CryptoError::NoSigningKey(_))
        ));
    }

    #[test]
    fn rotation_keeps_old_keys_resolvable() {
        let ring = Keyring::new();
        let issuer = IssuerId::new();
        let first = ring.generate_key(&issuer, CONTROLLER).unwrap();
        let second = ring.rotate(&issuer, CONTROLLER).unwrap();
        assert_ne!(first, second);
        assert_eq!(second.fragment(), "key-2");
        assert_eq!(ring.current_key_id(&issuer), Some(second.clone()));
        assert_eq!(ring.key_ids(&issuer), vec![first.clone(), second.clone()]);
        assert!(ring.resolve_public_key(&first).is_ok());
        assert_ne!(
            ring.resolve_public_key(&first).unwrap(),
            ring.resolve_public_key(&second).unwrap()
        );
        assert_eq!(ring.signing_key(&issuer).unwrap().key_id(), &second);
    }

    #[test]
    fn unknown_key_id() {
        let ring = Keyring::new();
        let missing = KeyId::parse("https://nowhere#key-1").unwrap();
        assert!(matches!(
            ring.resolve_public_key(&missing),
            Err(CryptoError::UnknownKey(_))
        ));
    }

    #[test]
    fn verification_methods_are_multikey() {
        let ring = Keyring::new();
        let issuer = IssuerId::new();
        ring.generate_key(&issuer, CONTROLLER).unwrap();
        ring.rotate(&issuer, CONTROLLER).unwrap();
        let vms = ring.verification_methods(&issuer);
        assert_eq!(vms.len(), 2);
        assert!(vms.iter().all(|vm| vm.method_type == "Multikey"));
        assert!(vms.iter().all(|vm| vm.controller == CONTROLLER));
        assert!(vms.iter().all(|vm| vm.public_key_multibase.starts_with("z6Mk")));
    }

    struct CountingProvider {
        ring: Keyring,
        lookups: AtomicUsize,
    }

    impl KeyProvider for CountingProvider {
        fn signing_key(&self, issuer: &IssuerId) -> Result<SigningKeyHandle, CryptoError> {
            self.ring.signing_key(issuer)
        }

        fn resolve_public_key(&self, key_id: &KeyId) -> Result<Ed25519PublicKey, CryptoError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.ring.resolve_public_key(key_id)
        }

        fn provider_name(&self) -> &str {
            "Counting"
        }
    }

    #[test]
    fn caching_resolver_hits_inner_once_and_survives_rotation() {
        let issuer = IssuerId::new();
        let ring = Keyring::new();
        let first = ring.generate_key(&issuer, CONTROLLER).unwrap();
        let cached = CachingKeyResolver::new(CountingProvider {
            ring,
            lookups: AtomicUsize::new(0),
        });

        cached.resolve_public_key(&first).unwrap();
        cached.resolve_public_key(&first).unwrap();
        assert_eq!(cached.inner().lookups.load(Ordering::SeqCst), 1);

        let second = cached.inner().ring.rotate(&issuer, CONTROLLER).unwrap();
        assert_eq!(cached.signing_key(&issuer).unwrap().key_id(), &second);
        assert!(cached.resolve_public_key(&first).is_ok());
        assert!(cached.resolve_public_key(&second).is_ok());
        assert_eq!(cached.inner().lookups.load(Ordering::SeqCst), 1);
        assert_eq!(cached.cached_len(), 2);
        assert_eq!(cached.provider_name(), "Counting");
    }

    #[test]
    fn provider_is_object_safe_and_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Keyring>();
        assert_send_sync::<CachingKeyResolver<Keyring>>();
        let _boxed: Box<dyn KeyProvider> = Box::new(Keyring::new());
    }

    #[test]
    fn handle_debug_is_redacted() {
        let ring = Keyring::new();
        let issuer = IssuerId::new();
        ring.generate_key(&issuer, CONTROLLER).unwrap();
        let debug = format!("{:?}", ring.signing_key(&issuer).unwrap());
        assert!(debug.contains("<private>"));
    }
}

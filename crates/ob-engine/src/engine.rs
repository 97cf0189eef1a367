//! # Credential Engine
//!
//! Owns the collaborators every pipeline needs: the repository, the issuer
//! keyring (behind a caching resolver for verification), the revocation
//! manager, and the hosted-IRI scheme. Issuer and achievement
//! administration lives here; the issuance and verification pipelines are
//! in their own modules.
//!
//! ## Key provisioning
//!
//! Each issuer's keys are controlled by its profile IRI. Without a master
//! seed the first key is random. With `issuer_key_seed` set it is derived as
//! `SHA-256(domain || master || issuer uuid)`, so a restarted process
//! re-creates the same verification method. Rotation always draws a fresh
//! random key.

use std::sync::Arc;

use ob_core::{AchievementId, IssuerId, KeyId};
use ob_crypto::{CachingKeyResolver, Ed25519KeyPair, Keyring, VerificationMethod};
use ob_status::{InMemoryStatusStore, RevocationManager, StatusListPersistence};
use ob_vc::{
    build_ob2_badge_class, build_ob2_issuer, Achievement, Alignment, HostedUrls, Issuer,
    Ob2BadgeClass, Ob2Issuer, ProofEngine,
};
use sha2::{Digest, Sha256};
use url::Url;

use crate::auth::{AuthContext, SCOPE_PROFILE_UPDATE};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::repository::{InMemoryRepository, Repository};

const ISSUER_SEED_DOMAIN: &[u8] = b"ob-engine/issuer-key/v1";

/// The issuance, revocation and verification engine.
pub struct CredentialEngine {
    pub(crate) config: EngineConfig,
    pub(crate) urls: HostedUrls,
    pub(crate) repo: Arc<dyn Repository>,
    pub(crate) keyring: Arc<Keyring>,
    pub(crate) proofs: ProofEngine,
    pub(crate) revocation: RevocationManager,
}

impl std::fmt::Debug for CredentialEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEngine")
            .field("config", &self.config)
            .field("proofs", &self.proofs)
            .finish_non_exhaustive()
    }
}

/// Input to [`CredentialEngine::register_issuer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssuer {
    /// Display name.
    pub name: String,
    /// Public homepage.
    pub url: String,
    /// Contact address.
    pub email: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Logo IRI.
    pub image: Option<String>,
}

/// A registered issuer and its first signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerRegistration {
    /// The stored issuer.
    pub issuer: Issuer,
    /// Its current verification method.
    pub key_id: KeyId,
}

/// Input to [`CredentialEngine::register_achievement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAchievement {
    /// Owning issuer.
    pub issuer_id: IssuerId,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Badge image IRI.
    pub image: Option<String>,
    /// What earning it requires.
    pub criteria_narrative: String,
    /// External criteria page.
    pub criteria_url: Option<String>,
    /// Framework alignments.
    pub alignments: Vec<Alignment>,
    /// Tags.
    pub tags: Vec<String>,
}

impl CredentialEngine {
    /// Wire an engine over injected collaborators.
    pub fn new(
        config: EngineConfig,
        repo: Arc<dyn Repository>,
        status_store: Arc<dyn StatusListPersistence>,
        keyring: Arc<Keyring>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let revocation = RevocationManager::new(status_store, config.status)?;
        let proofs = ProofEngine::new(Arc::new(CachingKeyResolver::new(Arc::clone(&keyring))));
        let urls = HostedUrls::new(&config.host_base_url);
        tracing::info!(
            base_url = urls.base(),
            page_capacity = config.status.page_capacity,
            max_pages = config.status.max_pages,
            deterministic_keys = config.issuer_key_seed.is_some(),
            "credential engine ready"
        );
        Ok(Self {
            config,
            urls,
            repo,
            keyring,
            proofs,
            revocation,
        })
    }

    /// An engine over in-memory collaborators.
    pub fn in_memory(config: EngineConfig) -> Result<Self, EngineError> {
        Self::new(
            config,
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryStatusStore::new()),
            Arc::new(Keyring::new()),
        )
    }

    /// Configuration in force.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// IRI scheme for hosted documents.
    pub fn urls(&self) -> &HostedUrls {
        &self.urls
    }

    /// The issuer keyring.
    pub fn keyring(&self) -> &Arc<Keyring> {
        &self.keyring
    }

    /// The revocation manager.
    pub fn revocation(&self) -> &RevocationManager {
        &self.revocation
    }

    /// Create an issuer and provision its first signing key.
    pub fn register_issuer(
        &self,
        auth: &AuthContext,
        request: NewIssuer,
    ) -> Result<IssuerRegistration, EngineError> {
        auth.require_scope(SCOPE_PROFILE_UPDATE)?;
        require_text("issuer name", &request.name)?;
        require_http_url("issuer url", &request.url)?;

        let issuer = Issuer {
            id: IssuerId::new(),
            name: request.name,
            url: request.url,
            email: request.email,
            description: request.description,
            image: request.image,
        };
        let controller = self.urls.issuer(&issuer.id);
        let key_id = match &self.config.issuer_key_seed {
            Some(master) => self.keyring.import_key(
                &issuer.id,
                &controller,
                Ed25519KeyPair::from_seed(&derive_issuer_seed(master, &issuer.id)),
            )?,
            None => self.keyring.generate_key(&issuer.id, &controller)?,
        };
        self.repo.put_issuer(&issuer)?;

        tracing::info!(principal = %auth.principal, issuer = %issuer.id, key_id = %key_id, "registered issuer");
        Ok(IssuerRegistration { issuer, key_id })
    }

    /// Create an achievement owned by an existing issuer.
    pub fn register_achievement(
        &self,
        auth: &AuthContext,
        request: NewAchievement,
    ) -> Result<Achievement, EngineError> {
        auth.require_scope(SCOPE_PROFILE_UPDATE)?;
        let issuer = self.repo.get_issuer(&request.issuer_id)?;
        require_text("achievement name", &request.name)?;
        require_text("criteria narrative", &request.criteria_narrative)?;
        if let Some(url) = &request.criteria_url {
            require_http_url("criteria url", url)?;
        }

        let achievement = Achievement {
            id: AchievementId::new(),
            issuer_id: issuer.id,
            name: request.name,
            description: request.description,
            image: request.image,
            criteria_narrative: request.criteria_narrative,
            criteria_url: request.criteria_url,
            alignments: request.alignments,
            tags: request.tags,
        };
        self.repo.put_achievement(&achievement)?;
        tracing::info!(principal = %auth.principal, issuer = %issuer.id, achievement = %achievement.id, "registered achievement");
        Ok(achievement)
    }

    /// Make a fresh key current for the issuer. Earlier keys stay resolvable.
    pub fn rotate_issuer_key(&self, auth: &AuthContext, issuer_id: &IssuerId) -> Result<KeyId, EngineError> {
        auth.require_scope(SCOPE_PROFILE_UPDATE)?;
        let issuer = self.repo.get_issuer(issuer_id)?;
        Ok(self.keyring.rotate(&issuer.id, &self.urls.issuer(&issuer.id))?)
    }

    /// Hosted OB2 issuer profile.
    pub fn issuer_profile(&self, issuer_id: &IssuerId) -> Result<Ob2Issuer, EngineError> {
        let issuer = self.repo.get_issuer(issuer_id)?;
        Ok(build_ob2_issuer(&issuer, &self.urls)?)
    }

    /// Every verification method the issuer has held, oldest first.
    pub fn issuer_keys(&self, issuer_id: &IssuerId) -> Result<Vec<VerificationMethod>, EngineError> {
        let issuer = self.repo.get_issuer(issuer_id)?;
        Ok(self.keyring.verification_methods(&issuer.id))
    }

    /// Hosted OB2 BadgeClass.
    pub fn badge_class(&self, achievement_id: &AchievementId) -> Result<Ob2BadgeClass, EngineError> {
        let achievement = self.repo.get_achievement(achievement_id)?;
        Ok(build_ob2_badge_class(&achievement, &self.urls)?)
    }
}

fn derive_issuer_seed(master_hex: &str, issuer: &IssuerId) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(ISSUER_SEED_DOMAIN);
    hasher.update(master_hex.to_ascii_lowercase().as_bytes());
    hasher.update(issuer.as_uuid().as_bytes());
    hasher.finalize().into()
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_http_url(field: &str, value: &str) -> Result<(), EngineError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(EngineError::InvalidRequest(format!(
            "{field} must be http(s), got {}",
            url.scheme()
        ))),
        Err(e) => Err(EngineError::InvalidRequest(format!("{field}: {e}"))),
    }
}

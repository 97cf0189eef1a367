//! Public IRIs derived from the host base URL.
//!
//! Every IRI the engine publishes is a pure function of the base URL and a
//! record id, so documents rebuilt later carry identical ids.

use ob_core::{AchievementId, CredentialId, IssuerId};

/// IRI scheme for hosted documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedUrls {
    base: String,
}

impl HostedUrls {
    /// Any trailing slash on `base` is dropped.
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// The base, without trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Issuer profile, also the controller of the issuer's keys.
    pub fn issuer(&self, id: &IssuerId) -> String {
        format!("{}/issuers/{id}", self.base)
    }

    /// OB2 BadgeClass / OB3 Achievement.
    pub fn badge_class(&self, id: &AchievementId) -> String {
        format!("{}/badges/{id}", self.base)
    }

    /// OB2 hosted assertion.
    pub fn assertion(&self, id: &CredentialId) -> String {
        format!("{}/assertions/{id}", self.base)
    }

    /// OB3 credential id.
    pub fn credential(&self, id: &CredentialId) -> String {
        format!("{}/credentials/{id}", self.base)
    }

    /// One page of an issuer's revocation list.
    pub fn status_list(&self, issuer: &IssuerId, page: u32) -> String {
        format!("{}/status/{issuer}/{page}", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_ignored_and_ids_round_trip() {
        let urls = HostedUrls::new("https://badges.example.com/");
        let id = CredentialId::new();
        let iri = urls.credential(&id);
        assert_eq!(iri, format!("https://badges.example.com/credentials/{id}"));
        assert_eq!(CredentialId::parse(&iri).unwrap(), id);
        assert_eq!(CredentialId::parse(&urls.assertion(&id)).unwrap(), id);
    }
}

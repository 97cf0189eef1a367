//! # Authorization Context
//!
//! Token validation happens upstream. The engine receives an already
//! authenticated principal and its granted scopes, trusts them as-is, and
//! checks that each pipeline's scope is present.
//!
//! Scope names are the Open Badges 3.0 OAuth scopes.

use std::collections::BTreeSet;

use crate::error::EngineError;

/// Create, update and revoke credentials.
pub const SCOPE_CREDENTIAL_UPSERT: &str =
    "https://purl.imsglobal.org/spec/ob/v3p0/scope/credential.upsert";
/// Read credentials.
pub const SCOPE_CREDENTIAL_READONLY: &str =
    "https://purl.imsglobal.org/spec/ob/v3p0/scope/credential.readonly";
/// Create and update issuer profiles and achievements.
pub const SCOPE_PROFILE_UPDATE: &str =
    "https://purl.imsglobal.org/spec/ob/v3p0/scope/profile.update";

/// The caller of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Who is calling.
    pub principal: String,
    scopes: BTreeSet<String>,
}

impl AuthContext {
    /// A principal holding `scopes`.
    pub fn new<I, S>(principal: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            principal: principal.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// A principal holding every engine scope.
    pub fn service(principal: impl Into<String>) -> Self {
        Self::new(
            principal,
            [
                SCOPE_CREDENTIAL_UPSERT,
                SCOPE_CREDENTIAL_READONLY,
                SCOPE_PROFILE_UPDATE,
            ],
        )
    }

    /// Whether the scope was granted.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// `Forbidden` unless the scope was granted.
    pub fn require_scope(&self, scope: &'static str) -> Result<(), EngineError> {
        if self.has_scope(scope) {
            Ok(())
        } else {
            tracing::warn!(principal = %self.principal, scope, "missing scope");
            Err(EngineError::Forbidden {
                principal: self.principal.clone(),
                scope,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ob_core::ErrorClass;

    #[test]
    fn scopes_are_checked_exactly() {
        let reader = AuthContext::new("reader", [SCOPE_CREDENTIAL_READONLY]);
        assert!(reader.require_scope(SCOPE_CREDENTIAL_READONLY).is_ok());
        let err = reader.require_scope(SCOPE_CREDENTIAL_UPSERT).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Forbidden);
        assert!(err.to_string().contains("reader"));
    }

    #[test]
    fn service_principal_holds_everything() {
        let svc = AuthContext::service("issuer-service");
        assert!(svc.has_scope(SCOPE_CREDENTIAL_UPSERT));
        assert!(svc.has_scope(SCOPE_PROFILE_UPDATE));
        assert!(!svc.has_scope("openid"));
    }
}

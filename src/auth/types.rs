//! Authentication context types.

use crate::jwt::Claims;

/// Principal established from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AuthenticatedPrincipal {
    pub id: i64,
    pub username: String,
    pub authorities: Vec<String>,
}

impl AuthenticatedPrincipal {
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    pub fn has_any_authority(&self, authorities: &[&str]) -> bool {
        authorities.iter().any(|a| self.has_authority(a))
    }

    /// Build from access token claims. Returns None if the principal ID is missing.
    pub fn from_access_claims(claims: Claims) -> Option<Self> {
        Some(Self {
            id: claims.uid?,
            username: claims.sub,
            authorities: claims.roles,
        })
    }
}

/// Per-request authentication state, stored in request extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthenticationContext {
    #[default]
    Anonymous,
    Authenticated(AuthenticatedPrincipal),
}

impl AuthenticationContext {
    pub fn principal(&self) -> Option<&AuthenticatedPrincipal> {
        match self {
            AuthenticationContext::Anonymous => None,
            AuthenticationContext::Authenticated(principal) => Some(principal),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthenticationContext::Authenticated(_))
    }
}

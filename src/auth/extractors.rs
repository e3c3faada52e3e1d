//! Axum extractors for authentication.
//!
//! These read the `AuthenticationContext` placed in request extensions by
//! `authenticate_request`. A request without one is treated as anonymous.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::AuthError;
use super::types::{AuthenticatedPrincipal, AuthenticationContext};
use crate::db::{ROLE_ADMIN, ROLE_USER};

/// Authority requirement for `Auth`.
pub trait RoleConstraint {
    fn allows(principal: &AuthenticatedPrincipal) -> bool;
}

/// Any authenticated principal.
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    fn allows(_: &AuthenticatedPrincipal) -> bool {
        true
    }
}

/// Principals holding `ROLE_USER` or `ROLE_ADMIN`.
pub struct UserOrAdmin;

impl RoleConstraint for UserOrAdmin {
    fn allows(principal: &AuthenticatedPrincipal) -> bool {
        principal.has_any_authority(&[ROLE_USER, ROLE_ADMIN])
    }
}

/// Principals holding `ROLE_ADMIN`.
pub struct AdminOnly;

impl RoleConstraint for AdminOnly {
    fn allows(principal: &AuthenticatedPrincipal) -> bool {
        principal.has_authority(ROLE_ADMIN)
    }
}

/// Requires an authenticated principal satisfying `R`.
/// Rejects anonymous requests with 401 and unauthorized principals with 403.
pub struct Auth<R = AnyRole> {
    pub principal: AuthenticatedPrincipal,
    _role: PhantomData<fn() -> R>,
}

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: Send + Sync,
    R: RoleConstraint,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<AuthenticationContext>()
            .and_then(AuthenticationContext::principal)
            .ok_or(AuthError::NotAuthenticated)?;

        if !R::allows(principal) {
            return Err(AuthError::Forbidden);
        }

        Ok(Auth {
            principal: principal.clone(),
            _role: PhantomData,
        })
    }
}

/// The principal if the request is authenticated. Never rejects.
pub struct OptionalAuth(pub Option<AuthenticatedPrincipal>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(
            parts
                .extensions
                .get::<AuthenticationContext>()
                .and_then(AuthenticationContext::principal)
                .cloned(),
        ))
    }
}

//! Request authentication middleware.
//!
//! Runs once per request, before routing to handlers. It never rejects a
//! request itself: a missing or invalid bearer token leaves the request
//! anonymous, and the extractors decide whether that is acceptable.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::types::{AuthenticatedPrincipal, AuthenticationContext};
use crate::jwt::JwtConfig;

/// Paths that skip token parsing entirely.
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &["/login", "/signup", "/refresh"];

#[derive(Clone)]
pub struct RequestAuthenticator {
    jwt: Arc<JwtConfig>,
    public_paths: Arc<[String]>,
}

impl RequestAuthenticator {
    /// Create an authenticator with the default public paths plus `extra_public_paths`.
    pub fn new(jwt: Arc<JwtConfig>, extra_public_paths: &[String]) -> Self {
        let public_paths = DEFAULT_PUBLIC_PATHS
            .iter()
            .map(|p| p.to_string())
            .chain(extra_public_paths.iter().cloned())
            .collect();
        Self { jwt, public_paths }
    }

    /// True if `path` equals a public path or lies beneath one.
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|public| {
            path == public
                || path
                    .strip_prefix(public.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Resolve the authentication context from request headers.
    pub fn authenticate(&self, headers: &HeaderMap) -> AuthenticationContext {
        let Some(token) = bearer_token(headers) else {
            return AuthenticationContext::Anonymous;
        };

        match self.jwt.parse_access(token) {
            Ok(claims) => match AuthenticatedPrincipal::from_access_claims(claims) {
                Some(principal) => AuthenticationContext::Authenticated(principal),
                None => AuthenticationContext::Anonymous,
            },
            Err(e) => {
                debug!(error = %e, "Ignoring invalid bearer token");
                AuthenticationContext::Anonymous
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Attach an `AuthenticationContext` to every request.
pub async fn authenticate_request(
    State(authenticator): State<RequestAuthenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = if authenticator.is_public(request.uri().path()) {
        AuthenticationContext::Anonymous
    } else {
        authenticator.authenticate(request.headers())
    };

    request.extensions_mut().insert(context);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::HeaderValue;

    use super::*;
    use crate::jwt::now_secs;

    const SECRET: &[u8] = b"test-secret-key-for-testing-0123456789";

    fn authenticator(extra: &[&str]) -> RequestAuthenticator {
        let jwt = JwtConfig::new(SECRET, Duration::from_secs(300), Duration::from_secs(3600)).unwrap();
        let extra: Vec<String> = extra.iter().map(|s| s.to_string()).collect();
        RequestAuthenticator::new(Arc::new(jwt), &extra)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_public_paths() {
        let auth = authenticator(&["/health"]);

        assert!(auth.is_public("/login"));
        assert!(auth.is_public("/signup"));
        assert!(auth.is_public("/refresh"));
        assert!(auth.is_public("/login/"));
        assert!(auth.is_public("/health"));
        assert!(auth.is_public("/health/live"));

        assert!(!auth.is_public("/"));
        assert!(!auth.is_public("/logout"));
        assert!(!auth.is_public("/loginx"));
        assert!(!auth.is_public("/user/profile"));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&bearer("abc")), Some("abc"));
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_valid_access_token_authenticates() {
        let auth = authenticator(&[]);
        let token = auth
            .jwt
            .issue_access_token(3, "alice", &["ROLE_USER".to_string()], now_secs())
            .unwrap()
            .token;

        let context = auth.authenticate(&bearer(&token));
        assert_eq!(
            context,
            AuthenticationContext::Authenticated(AuthenticatedPrincipal {
                id: 3,
                username: "alice".to_string(),
                authorities: vec!["ROLE_USER".to_string()],
            })
        );
    }

    #[test]
    fn test_invalid_tokens_leave_request_anonymous() {
        let auth = authenticator(&[]);

        assert!(!auth.authenticate(&HeaderMap::new()).is_authenticated());
        assert!(!auth.authenticate(&bearer("garbage")).is_authenticated());

        let expired = auth
            .jwt
            .issue_access_token(3, "alice", &[], 1_000)
            .unwrap()
            .token;
        assert!(!auth.authenticate(&bearer(&expired)).is_authenticated());

        let refresh = auth.jwt.issue_refresh_token("alice", now_secs()).unwrap().token;
        assert!(!auth.authenticate(&bearer(&refresh)).is_authenticated());
    }
}

//! JWT authentication with refresh token rotation.
//!
//! Short-lived access tokens (stateless, sent as `Authorization: Bearer`)
//! and longer-lived refresh tokens (one per user, database-tracked, sent as
//! an HttpOnly cookie). Each refresh consumes the refresh token; replaying
//! a consumed one is rejected as reuse.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod lifecycle;
mod middleware;
mod password;
mod state;
mod types;

pub use cookie::{REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie};
pub use errors::AuthError;
pub use extractors::{AdminOnly, AnyRole, Auth, OptionalAuth, RoleConstraint, UserOrAdmin};
pub use ip::{IpExtractor, extract_client_ip};
pub use lifecycle::{BEARER, TokenPair, TokenService};
pub use middleware::{
    DEFAULT_PUBLIC_PATHS, RequestAuthenticator, authenticate_request, bearer_token,
};
pub use password::{DEFAULT_PASSWORD_COST, hash_password, hash_password_with_cost, verify_password};
pub use state::ServerSettings;
pub use types::{AuthenticatedPrincipal, AuthenticationContext};

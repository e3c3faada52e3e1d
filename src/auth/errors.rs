//! Authentication error types.
//!
//! HTTP translation lives in `api::error`.

use crate::jwt::{JwtError, TokenError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    AuthenticationFailed,
    #[error(transparent)]
    Token(#[from] TokenError),
    /// Presented refresh token is not the active one for its principal.
    #[error("refresh token has been reused or is unknown")]
    RefreshTokenReuseOrUnknown,
    #[error("no refresh token presented")]
    MissingRefreshToken,
    #[error("authentication required")]
    NotAuthenticated,
    #[error("insufficient authority")]
    Forbidden,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        AuthError::Internal(e.to_string())
    }
}

//! Login, refresh token rotation, and logout.
//!
//! Every refresh consumes the presented token and issues a new pair. Only
//! the latest refresh token of a principal is ever accepted; presenting an
//! older one is treated as reuse.

use std::sync::Arc;

use tracing::{info, warn};

use super::errors::AuthError;
use super::password::verify_password;
use crate::db::{Database, User};
use crate::jwt::{Claims, JwtConfig, now_secs};

/// Value of the `token_type` field in issued pairs.
pub const BEARER: &str = "Bearer";

/// Tokens handed to a client after login or refresh.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: u64,
}

#[derive(Clone)]
pub struct TokenService {
    db: Database,
    jwt: Arc<JwtConfig>,
    revoke_on_reuse: bool,
}

impl TokenService {
    pub fn new(db: Database, jwt: Arc<JwtConfig>) -> Self {
        Self {
            db,
            jwt,
            revoke_on_reuse: false,
        }
    }

    /// When enabled, a reused refresh token also invalidates the
    /// principal's current one, forcing a fresh login.
    pub fn with_revoke_on_reuse(mut self, revoke_on_reuse: bool) -> Self {
        self.revoke_on_reuse = revoke_on_reuse;
        self
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Verify credentials and issue a new pair, replacing any previous
    /// refresh token of the principal.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let Some(user) = self.db.users().get_by_username(username).await? else {
            warn!(username = %username, "Login attempt for unknown user");
            return Err(AuthError::AuthenticationFailed);
        };

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(AuthError::AuthenticationFailed);
        }

        let now = now_secs();
        let pair = self.issue_pair(&user, now).await?;
        self.db
            .refresh_tokens()
            .upsert(user.id, &pair.refresh_token, now + pair.refresh_expires_in)
            .await?;

        info!(user_id = user.id, "User logged in");
        Ok(pair)
    }

    /// Exchange the active refresh token for a new pair.
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, AuthError> {
        let claims = self.jwt.parse_refresh(presented)?;

        let Some(record) = self.db.refresh_tokens().find_by_token_value(presented).await? else {
            return Err(self.on_reuse(&claims).await);
        };

        let user = match self.db.users().get_by_id(record.user_id).await? {
            Some(user) if user.username == claims.sub => user,
            _ => return Err(self.on_reuse(&claims).await),
        };

        let now = now_secs();
        let pair = self.issue_pair(&user, now).await?;

        let rotated = self
            .db
            .refresh_tokens()
            .rotate(
                user.id,
                presented,
                &pair.refresh_token,
                now + pair.refresh_expires_in,
            )
            .await?;
        if !rotated {
            // A concurrent refresh consumed the same token first
            return Err(self.on_reuse(&claims).await);
        }

        info!(user_id = user.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Invalidate the principal's refresh token. Returns false if there was none.
    pub async fn logout(&self, principal_id: i64) -> Result<bool, AuthError> {
        let deleted = self
            .db
            .refresh_tokens()
            .delete_by_principal(principal_id)
            .await?;
        info!(user_id = principal_id, revoked = deleted, "User logged out");
        Ok(deleted)
    }

    /// Revoke whichever principal currently holds `presented`.
    /// Returns false if the token is not active.
    pub async fn revoke_refresh_token(&self, presented: &str) -> Result<bool, AuthError> {
        let Some(record) = self
            .db
            .refresh_tokens()
            .find_by_token_value(presented)
            .await?
        else {
            return Ok(false);
        };
        self.logout(record.user_id).await
    }

    async fn issue_pair(&self, user: &User, now: u64) -> Result<TokenPair, AuthError> {
        let authorities = self.db.users().authorities(user.id).await?;
        let access = self
            .jwt
            .issue_access_token(user.id, &user.username, &authorities, now)?;
        let refresh = self.jwt.issue_refresh_token(&user.username, now)?;

        Ok(TokenPair {
            expires_in: access.duration(),
            refresh_expires_in: refresh.duration(),
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: BEARER,
        })
    }

    async fn on_reuse(&self, claims: &Claims) -> AuthError {
        warn!(subject = %claims.sub, "Refresh token reuse or unknown token");

        if self.revoke_on_reuse {
            match self.db.users().get_by_username(&claims.sub).await {
                Ok(Some(user)) => match self.db.refresh_tokens().delete_by_principal(user.id).await
                {
                    Ok(true) => warn!(user_id = user.id, "Revoked refresh token after reuse"),
                    Ok(false) => {}
                    Err(e) => warn!(user_id = user.id, error = %e, "Failed to revoke after reuse"),
                },
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Failed to look up principal after reuse"),
            }
        }

        AuthError::RefreshTokenReuseOrUnknown
    }
}

//! JWT token generation and validation.
//!
//! Access tokens carry the principal's authorities and are never stored.
//! Refresh tokens carry only the subject; the active one per principal is
//! tracked in the `refresh_tokens` table (see `db::RefreshTokenStore`).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default access token lifetime: 30 minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Default refresh token lifetime: 2 weeks.
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims shared by both token types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Principal ID, only present on access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<i64>,
    /// Granted authorities, only present on access tokens
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Random token ID so tokens issued within the same second differ
    pub jti: String,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl IssuedToken {
    /// Lifetime in seconds.
    pub fn duration(&self) -> u64 {
        self.expires_at - self.issued_at
    }
}

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token format is not supported")]
    Unsupported,
}

impl From<&ErrorKind> for TokenError {
    fn from(kind: &ErrorKind) -> Self {
        match kind {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::Unsupported
            }
            _ => TokenError::Malformed,
        }
    }
}

/// Errors raised while configuring the codec or signing tokens.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("failed to encode token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("access token lifetime must be at least one second")]
    AccessTtlTooShort,
    #[error("refresh token lifetime must be longer than the access token lifetime")]
    RefreshTtlTooShort,
}

/// Signs and verifies tokens with a single HS256 key.
///
/// Immutable after construction; share it behind an `Arc`.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtConfig {
    /// Create a codec with the given secret and token lifetimes.
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Result<Self, JwtError> {
        if access_ttl.as_secs() == 0 {
            return Err(JwtError::AccessTtlTooShort);
        }
        if refresh_ttl.as_secs() <= access_ttl.as_secs() {
            return Err(JwtError::RefreshTtlTooShort);
        }

        // Expiry is checked in `parse_at` so callers can supply the clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign an access token for a principal with its current authorities.
    pub fn issue_access_token(
        &self,
        principal_id: i64,
        subject: &str,
        authorities: &[String],
        now: u64,
    ) -> Result<IssuedToken, JwtError> {
        let claims = Claims {
            sub: subject.to_string(),
            uid: Some(principal_id),
            roles: authorities.to_vec(),
            token_type: TokenType::Access,
            iat: now,
            exp: now + self.access_ttl.as_secs(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    /// Sign a refresh token. Authorities are deliberately left out.
    pub fn issue_refresh_token(&self, subject: &str, now: u64) -> Result<IssuedToken, JwtError> {
        let claims = Claims {
            sub: subject.to_string(),
            uid: None,
            roles: Vec::new(),
            token_type: TokenType::Refresh,
            iat: now,
            exp: now + self.refresh_ttl.as_secs(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<IssuedToken, JwtError> {
        let token = jsonwebtoken::encode(&Header::default(), claims, &self.encoding_key)?;
        Ok(IssuedToken {
            token,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    /// Verify a token of either type against the current time.
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        self.parse_at(token, now_secs())
    }

    /// Verify a token of either type as of `now`.
    /// A token is expired from the instant `now` reaches its `exp`.
    pub fn parse_at(&self, token: &str, now: u64) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::from(e.kind()))?;

        if now >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }

    /// Verify an access token. Refresh tokens are rejected as unsupported.
    pub fn parse_access(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.parse(token)?;
        if claims.token_type != TokenType::Access {
            return Err(TokenError::Unsupported);
        }
        if claims.uid.is_none() {
            return Err(TokenError::Malformed);
        }
        Ok(claims)
    }

    /// Verify a refresh token. Access tokens are rejected as unsupported.
    pub fn parse_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.parse(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(TokenError::Unsupported);
        }
        Ok(claims)
    }

    /// True iff `parse` succeeds.
    pub fn validate(&self, token: &str) -> bool {
        self.parse(token).is_ok()
    }
}

/// Current Unix time in seconds.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

//! Password hashing with bcrypt.
//!
//! bcrypt is CPU-bound, so the async helpers run it on the blocking pool.

use super::errors::AuthError;

/// Default bcrypt work factor.
pub const DEFAULT_PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;

pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Hash a password off the async runtime.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password_with_cost(&password, cost))
        .await
        .map_err(|e| AuthError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| AuthError::Internal(format!("failed to hash password: {e}")))
}

/// Check a password against a stored hash off the async runtime.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash))
        .await
        .map_err(|e| AuthError::Internal(format!("password verification task failed: {e}")))?
        .map_err(|e| AuthError::Internal(format!("failed to verify password: {e}")))
}

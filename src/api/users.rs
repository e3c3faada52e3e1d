use axum::{
    Json, Router, extract::State, http::StatusCode, middleware, response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::auth::hash_password;
use crate::db::{Database, ROLE_USER};
use crate::rate_limit::{RateLimitConfig, rate_limit_signup};

const USERNAME_MIN_CHARS: usize = 4;
const USERNAME_MAX_CHARS: usize = 20;
const PASSWORD_MIN_CHARS: usize = 8;
/// bcrypt ignores input past 72 bytes.
const PASSWORD_MAX_BYTES: usize = 72;
const NICKNAME_MAX_CHARS: usize = 50;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub password_cost: u32,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config,
            rate_limit_signup,
        ))
}

#[derive(Deserialize)]
struct SignupRequest {
    username: String,
    password: String,
    nickname: String,
}

#[derive(Serialize)]
struct SignupResponse {
    id: i64,
    username: String,
}

fn validate_signup(payload: &SignupRequest) -> Result<(), ApiError> {
    let username_len = payload.username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&username_len) {
        return Err(ApiError::bad_request(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN_CHARS, USERNAME_MAX_CHARS
        )));
    }

    // Only allow alphanumeric and underscores
    if !payload
        .username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ));
    }

    if payload.password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_CHARS
        )));
    }

    if payload.password.len() > PASSWORD_MAX_BYTES {
        return Err(ApiError::bad_request(format!(
            "Password cannot be longer than {} bytes",
            PASSWORD_MAX_BYTES
        )));
    }

    let nickname = payload.nickname.trim();
    if nickname.is_empty() {
        return Err(ApiError::bad_request("Nickname cannot be empty"));
    }

    if nickname.chars().count() > NICKNAME_MAX_CHARS {
        return Err(ApiError::bad_request(format!(
            "Nickname cannot be longer than {} characters",
            NICKNAME_MAX_CHARS
        )));
    }

    Ok(())
}

async fn signup(
    State(state): State<UsersState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_signup(&payload)?;

    let available = state
        .db
        .users()
        .is_username_available(&payload.username)
        .await
        .db_err("Failed to check username availability")?;

    if !available {
        return Err(ApiError::conflict("Username is already taken"));
    }

    let password_hash = hash_password(payload.password, state.password_cost).await?;

    let id = match state
        .db
        .users()
        .create_with_roles(
            &payload.username,
            &password_hash,
            payload.nickname.trim(),
            &[ROLE_USER],
        )
        .await
    {
        Ok(id) => id,
        // Lost a race with a concurrent signup for the same name
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::conflict("Username is already taken"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    };

    info!(user_id = id, username = %payload.username, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id,
            username: payload.username,
        }),
    ))
}

//! Token API endpoints.
//!
//! - POST `/login` - Exchange credentials for an access token and refresh cookie
//! - POST `/refresh` - Rotate the refresh cookie and issue a new access token
//! - POST `/logout` - Revoke the refresh token and clear the cookie

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{
    AuthError, OptionalAuth, REFRESH_COOKIE_NAME, ServerSettings, TokenPair, TokenService,
    clear_refresh_cookie, get_cookie, refresh_cookie,
};
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

#[derive(Clone)]
pub struct TokensState {
    pub tokens: TokenService,
    pub settings: Arc<ServerSettings>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: TokensState) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_login,
        ));

    Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state)
        .merge(login_router)
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
}

/// Successful login or refresh: access token in the body, refresh token in a cookie.
fn token_response(settings: &ServerSettings, pair: TokenPair) -> Response {
    let cookie = refresh_cookie(
        &pair.refresh_token,
        pair.refresh_expires_in,
        settings.secure_cookies,
    );

    (
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(TokenResponse {
            access_token: pair.access_token,
            token_type: pair.token_type,
            expires_in: pair.expires_in,
        }),
    )
        .into_response()
}

fn append_clear_cookie(response: &mut Response, secure: bool) {
    if let Ok(value) = HeaderValue::from_str(&clear_refresh_cookie(secure)) {
        response.headers_mut().append(SET_COOKIE, value);
    }
}

async fn login(
    State(state): State<TokensState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let pair = state
        .tokens
        .login(&payload.username, &payload.password)
        .await?;
    Ok(token_response(&state.settings, pair))
}

/// Rotate the refresh token. Auth failures also clear the cookie so the
/// client stops presenting a dead token.
async fn refresh(State(state): State<TokensState>, headers: HeaderMap) -> Response {
    let result = match get_cookie(&headers, REFRESH_COOKIE_NAME) {
        Some(token) => state.tokens.refresh(token).await,
        None => Err(AuthError::MissingRefreshToken),
    };

    match result {
        Ok(pair) => token_response(&state.settings, pair),
        Err(e) => {
            let mut response = ApiError::from(e).into_response();
            if response.status() == StatusCode::UNAUTHORIZED {
                append_clear_cookie(&mut response, state.settings.secure_cookies);
            }
            response
        }
    }
}

/// Logout revokes the refresh token of the bearer principal, or the one in
/// the cookie when no valid access token is presented.
async fn logout(
    State(state): State<TokensState>,
    OptionalAuth(principal): OptionalAuth,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    match principal {
        Some(principal) => {
            state.tokens.logout(principal.id).await?;
        }
        None => {
            if let Some(token) = get_cookie(&headers, REFRESH_COOKIE_NAME) {
                state.tokens.revoke_refresh_token(token).await?;
            }
        }
    }

    let mut response = (
        StatusCode::OK,
        Json(serde_json::json!({ "success": true })),
    )
        .into_response();
    append_clear_cookie(&mut response, state.settings.secure_cookies);
    Ok(response)
}

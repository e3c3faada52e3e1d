mod error;
mod pages;
mod tokens;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::{ServerSettings, TokenService};
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ResultExt};

/// Create the API router.
pub fn create_api_router(
    tokens: TokenService,
    settings: Arc<ServerSettings>,
    rate_limit_config: Arc<RateLimitConfig>,
    password_cost: u32,
) -> Router {
    let users_state = users::UsersState {
        db: tokens.db().clone(),
        password_cost,
        rate_limit_config: rate_limit_config.clone(),
    };

    let pages_state = pages::PagesState {
        db: tokens.db().clone(),
    };

    let tokens_state = tokens::TokensState {
        tokens,
        settings,
        rate_limit_config,
    };

    Router::new()
        .merge(users::router(users_state))
        .merge(tokens::router(tokens_state))
        .merge(pages::router(pages_state))
}

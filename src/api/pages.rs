//! Demonstration endpoints for each access level.
//!
//! - GET `/` - Anyone; greets the principal if authenticated
//! - GET `/user/profile` - `ROLE_USER` or `ROLE_ADMIN`
//! - GET `/admin/manage` - `ROLE_ADMIN`

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;

use super::error::{ApiError, ResultExt};
use crate::auth::{AdminOnly, Auth, OptionalAuth, UserOrAdmin};
use crate::db::Database;

#[derive(Clone)]
pub struct PagesState {
    pub db: Database,
}

pub fn router(state: PagesState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/user/profile", get(profile))
        .route("/admin/manage", get(admin_manage))
        .with_state(state)
}

#[derive(Serialize)]
struct IndexResponse {
    message: String,
    authenticated: bool,
}

async fn index(OptionalAuth(principal): OptionalAuth) -> impl IntoResponse {
    let response = match principal {
        Some(principal) => IndexResponse {
            message: format!(
                "Hello, {}! Your authorities: {}",
                principal.username,
                principal.authorities.join(", ")
            ),
            authenticated: true,
        },
        None => IndexResponse {
            message: "Hello, anonymous visitor!".to_string(),
            authenticated: false,
        },
    };
    Json(response)
}

#[derive(Serialize)]
struct ProfileResponse {
    id: i64,
    username: String,
    nickname: String,
    authorities: Vec<String>,
}

async fn profile(
    State(state): State<PagesState>,
    auth: Auth<UserOrAdmin>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(auth.principal.id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse {
        id: user.id,
        username: user.username,
        nickname: user.nickname,
        authorities: auth.principal.authorities,
    }))
}

async fn admin_manage(auth: Auth<AdminOnly>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Admin area",
        "username": auth.principal.username,
    }))
}

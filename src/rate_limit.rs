//! Rate limiting for credential endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing and signup spam.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::api::ApiError;
use crate::auth::{IpExtractor, extract_client_ip};

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const LOGIN_PER_SEC: u32 = 1;
const LOGIN_BURST: u32 = 5;
const SIGNUP_PER_MIN: u32 = 3;

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login (1 per second, bursts of 5)
    pub login: Arc<IpLimiter>,
    /// Per-IP limiter for signup (3 per minute)
    pub signup: Arc<IpLimiter>,
    /// Where to read the client IP from
    pub ip_extractor: Option<IpExtractor>,
}

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

impl RateLimitConfig {
    /// Create rate limiters with the default limits.
    pub fn new(ip_extractor: Option<IpExtractor>) -> Self {
        Self::with_limits(ip_extractor, LOGIN_BURST, SIGNUP_PER_MIN)
    }

    /// Create rate limiters with a custom login burst and signup rate.
    pub fn with_limits(
        ip_extractor: Option<IpExtractor>,
        login_burst: u32,
        signup_per_min: u32,
    ) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(non_zero(LOGIN_PER_SEC)).allow_burst(non_zero(login_burst)),
            )),
            signup: Arc::new(RateLimiter::keyed(Quota::per_minute(non_zero(
                signup_per_min,
            )))),
            ip_extractor,
        }
    }
}

fn check(config: &RateLimitConfig, limiter: &IpLimiter, request: &Request) -> Result<(), ApiError> {
    let ip = extract_client_ip(request, config.ip_extractor)
        .map_err(|_| ApiError::forbidden("Unable to determine client IP"))?;

    limiter.check_key(&ip).map_err(|_| {
        warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
        ApiError::too_many_requests("Too many attempts. Please wait before trying again.")
    })
}

/// Middleware for rate limiting login.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(&config, &config.login, &request) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Middleware for rate limiting signup.
pub async fn rate_limit_signup(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(&config, &config.signup, &request) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use rotoken::{
    ServerConfig,
    auth::{IpExtractor, hash_password_with_cost},
    create_app,
    db::Database,
    jwt::JwtConfig,
    rate_limit::RateLimitConfig,
};
use tower::ServiceExt;

pub const TEST_IP: &str = "127.0.0.1";
pub const TEST_PASSWORD: &str = "password123";

const SECRET: &[u8] = b"test-jwt-secret-for-integration-tests";

/// Lowest bcrypt cost, keeps tests fast.
const TEST_PASSWORD_COST: u32 = 4;

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

/// Builder for test setup with various options
pub struct TestSetup {
    revoke_on_reuse: bool,
    secure_cookies: bool,
    public_paths: Vec<String>,
    login_burst: u32,
    signup_per_min: u32,
}

impl TestSetup {
    pub fn new() -> Self {
        Self {
            revoke_on_reuse: false,
            secure_cookies: false,
            public_paths: Vec::new(),
            login_burst: 1000,
            signup_per_min: 1000,
        }
    }

    pub fn with_revoke_on_reuse(mut self) -> Self {
        self.revoke_on_reuse = true;
        self
    }

    pub fn with_secure_cookies(mut self) -> Self {
        self.secure_cookies = true;
        self
    }

    pub fn with_public_path(mut self, path: &str) -> Self {
        self.public_paths.push(path.to_string());
        self
    }

    pub fn with_rate_limits(mut self, login_burst: u32, signup_per_min: u32) -> Self {
        self.login_burst = login_burst;
        self.signup_per_min = signup_per_min;
        self
    }

    pub async fn build(self) -> TestApp {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let jwt = Arc::new(
            JwtConfig::new(SECRET, Duration::from_secs(300), Duration::from_secs(3600))
                .expect("Invalid token lifetimes"),
        );

        let config = ServerConfig {
            db: db.clone(),
            jwt: jwt.clone(),
            secure_cookies: self.secure_cookies,
            revoke_on_reuse: self.revoke_on_reuse,
            public_paths: self.public_paths,
            password_cost: TEST_PASSWORD_COST,
            rate_limit: RateLimitConfig::with_limits(
                Some(IpExtractor::XForwardedFor),
                self.login_burst,
                self.signup_per_min,
            ),
        };

        TestApp {
            app: create_app(&config),
            db,
            jwt,
        }
    }
}

pub async fn setup() -> TestApp {
    TestSetup::new().build().await
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed")
    }

    /// Create a user directly in the database and return its ID.
    pub async fn create_user(&self, username: &str, roles: &[&str]) -> i64 {
        let hash = hash_password_with_cost(TEST_PASSWORD, TEST_PASSWORD_COST).unwrap();
        self.db
            .users()
            .create_with_roles(username, &hash, username, roles)
            .await
            .unwrap()
    }

    pub async fn login(&self, username: &str, password: &str) -> Response<Body> {
        self.send(json_post(
            "/login",
            serde_json::json!({ "username": username, "password": password }),
        ))
        .await
    }

    /// Log in and return (access_token, refresh_token).
    pub async fn login_tokens(&self, username: &str) -> (String, String) {
        let response = self.login(username, TEST_PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK);

        let refresh = refresh_token_from(&extract_set_cookies(&response))
            .expect("Login should set a refresh cookie");
        let body = body_json(response).await;
        let access = body["accessToken"].as_str().unwrap().to_string();
        (access, refresh)
    }

    pub async fn refresh(&self, refresh_token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("POST").uri("/refresh");
        if let Some(token) = refresh_token {
            builder = builder.header("cookie", format!("refresh_token={}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn get(&self, uri: &str, access_token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = access_token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}

/// A JSON POST request from `TEST_IP`.
pub fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", TEST_IP)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Check if cookies contain a token being cleared (Max-Age=0)
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=", cookie_name)) && c.contains("Max-Age=0"))
}

/// The refresh token set by a response, ignoring clearing cookies.
pub fn refresh_token_from(cookies: &[String]) -> Option<String> {
    cookies
        .iter()
        .filter(|c| !c.contains("Max-Age=0"))
        .find_map(|c| c.strip_prefix("refresh_token="))
        .and_then(|rest| rest.split(';').next())
        .map(|token| token.to_string())
}

#![allow(dead_code)]

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use pursuit::{
    ServerConfig, cli::Platform, clock::ManualClock, create_app, db::Database,
    metrics::RequestMetrics,
};
use tower::ServiceExt;

pub const JWT_SECRET: &[u8] = b"integration-test-secret-0123456789";
pub const START: u64 = 1_700_000_000;

pub const BROWSER_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";
pub const CLI_UA: &str = "curl/8.5.0";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub clock: Arc<ManualClock>,
    pub metrics: Arc<RequestMetrics>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body is not JSON")
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
    }
}

pub async fn create_test_app(platform: Platform) -> TestApp {
    create_test_app_with_limits(platform, 1000, 1000).await
}

pub async fn create_test_app_with_limits(platform: Platform, login: u32, signup: u32) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let clock = Arc::new(ManualClock::new(START));
    let metrics = Arc::new(RequestMetrics::new());

    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: JWT_SECRET.to_vec(),
        platform,
        login_per_minute: NonZeroU32::new(login).unwrap(),
        signup_per_minute: NonZeroU32::new(signup).unwrap(),
        clock: clock.clone(),
        metrics: metrics.clone(),
    };

    TestApp {
        app: create_app(&config).expect("Failed to create app"),
        db,
        clock,
        metrics,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    pub async fn post_json(&self, uri: &str, json: serde_json::Value) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .header("user-agent", CLI_UA)
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
    }

    /// POST with no body and `Authorization: Bearer <token>`.
    pub async fn post_bearer(&self, uri: &str, token: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn get_bearer(&self, uri: &str, token: &str) -> TestResponse {
        self.send(
            Request::builder()
                .uri(uri)
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn register(&self, email: &str, username: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/users",
            serde_json::json!({ "email": email, "username": username, "password": password }),
        )
        .await
    }

    pub async fn login_as(&self, user_agent: &str, email: &str, password: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header("content-type", "application/json")
                .header("user-agent", user_agent)
                .body(Body::from(
                    serde_json::json!({ "email": email, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.login_as(CLI_UA, email, password).await
    }

    /// Make every refresh token query fail from here on.
    pub async fn break_refresh_token_store(&self) {
        sqlx::query("DROP TABLE refresh_tokens")
            .execute(self.db.pool())
            .await
            .expect("Failed to drop refresh_tokens");
    }
}

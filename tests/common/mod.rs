#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tollgate::{
    ServerConfig,
    clock::ManualTimeSource,
    create_app,
    db::Database,
    jwt::{JwtConfig, SigningKey},
};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "dGVzdHNlY3JldGtleWZvcmp3dHRlc3Rz";
pub const START: u64 = 1_700_000_000;
pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub clock: Arc<ManualTimeSource>,
    pub jwt: JwtConfig,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let clock = Arc::new(ManualTimeSource::new(START));
        let signing_key = SigningKey::from_base64(TEST_SECRET).expect("Invalid test secret");
        let jwt = JwtConfig::with_time_source(&signing_key, clock.clone());
        let config = ServerConfig {
            db: db.clone(),
            signing_key,
            time_source: clock.clone(),
            bcrypt_cost: 4,
        };
        Self {
            app: create_app(&config),
            db,
            clock,
            jwt,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Sign up through the API and return the new user id.
    pub async fn sign_up(&self, username: &str) -> i64 {
        let response = self
            .send(json_request(
                "POST",
                "/auth/sign-up",
                json!({ "username": username, "password": PASSWORD }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["userId"].as_i64().unwrap()
    }

    /// Log in through the API and return the response body.
    pub async fn login(&self, username: &str) -> Value {
        let response = self
            .send(json_request(
                "POST",
                "/auth/login",
                json!({ "username": username, "password": PASSWORD }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn refresh_request(access: Option<&str>, refresh: Option<&str>, user_id: &str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/auth/refresh");
    if let Some(access) = access {
        builder = builder.header("Authorization", format!("Bearer {}", access));
    }
    if let Some(refresh) = refresh {
        builder = builder.header("refresh", refresh);
    }
    if !user_id.is_empty() {
        builder = builder.header("userId", user_id);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

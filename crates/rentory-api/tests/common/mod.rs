//! Shared helpers for driving the router in-process

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use rentory_api::{build_router, AppState, Config};
use rentory_inventory::Repositories;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret-for-integration";

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config
}

/// Signed HS256 token for `sub`
pub fn token_for(sub: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": sub,
        "iat": now,
        "exp": now + 3600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let state = AppState::new(config, Repositories::in_memory()).unwrap();
        Self {
            router: build_router(state.clone()),
            state,
            token: token_for("user-1"),
        }
    }

    /// Same storage, different tenant
    pub fn as_user(&self, sub: &str) -> Self {
        Self {
            router: self.router.clone(),
            state: self.state.clone(),
            token: token_for(sub),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(self.request(Method::GET, uri, None)).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(self.request(Method::POST, uri, Some(body))).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(self.request(Method::PATCH, uri, Some(body))).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(self.request(Method::DELETE, uri, None)).await
    }

    pub async fn create_item(&self, name: &str, quantity: i32, rate: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/items",
                json!({ "name": name, "quantity": quantity, "daily_rate": rate }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn create_customer(&self, name: &str) -> String {
        let (status, body) = self
            .post("/api/v1/customers", json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

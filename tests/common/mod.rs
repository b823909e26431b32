#![allow(dead_code)]

use std::net::SocketAddr;
use std::str::FromStr;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use helpdesk::config::{AdminSeed, Config};
use helpdesk::state::SharedState;

pub const ADMIN_EMAIL: &str = "admin@company.com";
pub const ADMIN_PASSWORD: &str = "password";
pub const ADMIN_NAME: &str = "Test Admin";

/// A running test server backed by its own in-memory database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: SqlitePool,
    pub client: Client,
    pub state: SharedState,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Send a request and hand back the JSON body (null when absent) and status.
    async fn send(&self, request: RequestBuilder) -> (Value, StatusCode) {
        let resp = request.send().await.expect("request failed");
        let status = resp.status();
        (resp.json().await.unwrap_or(Value::Null), status)
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> (Value, StatusCode) {
        let mut body = json!({ "name": name, "email": email, "password": password });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        self.send(self.client.post(self.url("/api/v1/auth/register")).json(&body))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let body = json!({ "email": email, "password": password });
        self.send(self.client.post(self.url("/api/v1/auth/login")).json(&body))
            .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> (Value, StatusCode) {
        let body = json!({ "refreshToken": refresh_token });
        self.send(self.client.post(self.url("/api/v1/auth/refresh")).json(&body))
            .await
    }

    pub async fn admin_token(&self) -> String {
        let (body, status) = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        body["accessToken"].as_str().unwrap().to_string()
    }

    /// Registers and logs in a user holding `role`. Returns (user id, access token).
    pub async fn user_with_role(&self, name: &str, email: &str, role: &str) -> (String, String) {
        let (body, status) = self.register(name, email, "password123", Some(role)).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let id = body["id"].as_str().unwrap().to_string();

        let (body, status) = self.login(email, "password123").await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        (id, body["accessToken"].as_str().unwrap().to_string())
    }

    pub async fn create_ticket(&self, token: &str, body: &Value) -> Value {
        let (ticket, status) = self.post_auth("/api/v1/tickets", token, body).await;
        assert_eq!(status, StatusCode::CREATED, "create ticket failed: {ticket}");
        ticket
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        self.send(self.client.get(self.url(path)).bearer_auth(token))
            .await
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        self.send(self.client.post(self.url(path)).bearer_auth(token).json(body))
            .await
    }

    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        self.send(self.client.put(self.url(path)).bearer_auth(token).json(body))
            .await
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        self.send(self.client.delete(self.url(path)).bearer_auth(token))
            .await
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        jwt_refresh_secret: "test-refresh-secret-that-is-long-enough".to_string(),
        access_token_minutes: 60,
        refresh_token_days: 7,
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        frontend_url: "http://localhost:5173".to_string(),
        max_body_size: 1_048_576,
        log_level: "warn".to_string(),
        admin: AdminSeed {
            name: ADMIN_NAME.to_string(),
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        },
    }
}

/// Serves the app on an ephemeral port over a freshly migrated and seeded
/// in-memory database.
pub async fn spawn_app() -> TestApp {
    let config = test_config();

    // A single connection that never recycles, so every query sees the same
    // in-memory database.
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    helpdesk::db::seed::run(&pool, &config.admin)
        .await
        .expect("Failed to seed test database");

    let (router, state) = helpdesk::build_app(pool.clone(), config);
    helpdesk::automation::spawn(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server stopped");
    });

    TestApp {
        addr,
        pool,
        client: Client::new(),
        state,
    }
}

pub async fn cleanup(app: TestApp) {
    app.pool.close().await;
}

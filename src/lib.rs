pub mod auth;
pub mod automation;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::events::EventBus;
use crate::state::{AppState, SharedState};

/// Assemble the HTTP application. The returned state is the same one the
/// handlers see, so callers can subscribe to the event bus.
pub fn build_app(pool: SqlitePool, config: Config) -> (Router, SharedState) {
    let cors = cors_layer(&config.frontend_url);
    let max_body_size = config.max_body_size;

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        events: EventBus::new(),
    });

    let app = Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(max_body_size))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("referrer-policy"),
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                )),
        )
        .with_state(state.clone());

    (app, state)
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => cors.allow_origin(AllowOrigin::exact(origin)),
        Err(e) => {
            tracing::warn!("FRONTEND_URL is not a valid origin, CORS disabled: {e}");
            cors
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now(),
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}

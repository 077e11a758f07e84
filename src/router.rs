// src/router.rs
//! Router composition and cross-cutting layers

use axum::{
    extract::Extension,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::common::AppState;
use crate::{auth, logging_middleware, roles};

pub const SERVICE_NAME: &str = "iam-service";

/// GET /health
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
}

pub fn create_router(shared: Arc<RwLock<AppState>>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(auth::auth_routes())
        .merge(roles::roles_routes())
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

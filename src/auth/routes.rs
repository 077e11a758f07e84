//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /register`, `POST /auth/register` - Local account registration
/// - `POST /login`, `POST /auth/login` - Username/password login
/// - `GET /auth/google/url` - Google consent URL
/// - `POST /auth/google` - Google authorization-code login
/// - `GET /me`, `GET /api/v1/me` - Current user
/// - `POST /api/v1/otp/generate`, `POST /api/v1/otp/verify` - OTP channels
pub fn auth_routes() -> Router {
    Router::new()
        .route("/register", post(handlers::register_handler))
        .route("/auth/register", post(handlers::register_handler))
        .route("/login", post(handlers::login_handler))
        .route("/auth/login", post(handlers::login_handler))
        .route("/auth/google/url", get(handlers::google_url_handler))
        .route("/auth/google", post(handlers::google_login_handler))
        .route("/me", get(handlers::me_handler))
        .route("/api/v1/me", get(handlers::me_handler))
        .route("/api/v1/otp/generate", post(handlers::otp_generate_handler))
        .route("/api/v1/otp/verify", post(handlers::otp_verify_handler))
}

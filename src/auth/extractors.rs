//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::common::helpers::safe_token_log;
use crate::common::{safe_email_log, ApiError, AppState};

/// Caller identity taken from a valid bearer token.
///
/// Only the signature and expiry are checked; handlers that need the
/// full account load it themselves.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let tokens = state_lock.read().await.tokens.clone();

        let header = match parts.headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
            Some(h) => h,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(ApiError::Unauthorized(
                    "Authorization header is required".into(),
                ));
            }
        };

        let bare_token = match bearer_token(header) {
            Some(t) => t,
            None => {
                warn!("Authentication failed: Authorization header is not a bearer token");
                return Err(ApiError::Unauthorized(
                    "Authorization header must be 'Bearer <token>'".into(),
                ));
            }
        };

        let claims = tokens.validate(bare_token).map_err(|e| {
            warn!(error = %e, token = %safe_token_log(bare_token), "JWT token validation failed");
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;

        debug!(
            user_id = %claims.sub,
            email = %safe_email_log(&claims.email),
            "Request authenticated"
        );

        Ok(AuthedUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

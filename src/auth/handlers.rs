//! Authentication handlers

use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::errors::AuthError;
use super::extractors::AuthedUser;
use super::models::{
    AuthResponse, GoogleLoginRequest, LoginRequest, OtpGenerateRequest, OtpVerifyRequest,
    ProviderKind, RegisterRequest, SuccessResponse, User,
};
use super::oauth::AuthorizationRedirect;
use super::validators::parse_otp_provider;
use crate::common::{safe_email_log, ApiError, AppState, ValidationResult, Validator};

fn check<T: Validator<T>>(payload: &T) -> Result<(), ApiError> {
    let result = payload.validate(payload);
    if result.is_valid {
        Ok(())
    } else {
        Err(result.into())
    }
}

/// POST /register, /auth/register
///
/// Creates a local account and returns a token for it.
/// Any `role` field in the body is ignored.
pub async fn register_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    check(&payload)?;
    info!(email = %safe_email_log(&payload.email), "📝 Registration request");

    let state = state_lock.read().await.clone();
    let response = state.local_auth().register(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new("User created successfully", response)),
    ))
}

/// POST /login, /auth/login
pub async fn login_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(payload) = payload?;
    check(&payload)?;

    let state = state_lock.read().await.clone();
    let response = state
        .local_auth()
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(response))
}

/// GET /auth/google/url
///
/// The `state` value is returned to the client, which is responsible
/// for matching it against the callback.
pub async fn google_url_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<Json<AuthorizationRedirect>, ApiError> {
    let state = state_lock.read().await.clone();
    let google = state.google_auth().ok_or(AuthError::IdpNotConfigured)?;

    let redirect = google.authorization_url();
    debug!("Generated Google authorization URL");
    Ok(Json(redirect))
}

/// POST /auth/google
///
/// # Request Body
/// ```json
/// { "code": "<authorization code from the consent redirect>" }
/// ```
pub async fn google_login_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    payload: Result<Json<GoogleLoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(payload) = payload?;
    check(&payload)?;
    info!("🔐 Received Google auth request");

    let state = state_lock.read().await.clone();
    let google = state.google_auth().ok_or(AuthError::IdpNotConfigured)?;
    let response = google.login(payload.code.trim()).await?;

    Ok(Json(response))
}

#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub providers: Vec<String>,
}

/// GET /me, /api/v1/me
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<Json<SuccessResponse<MeResponse>>, ApiError> {
    let state = state_lock.read().await.clone();

    let account = state
        .identity_store
        .user_by_id(&user.id)
        .await
        .map_err(AuthError::from)?
        .ok_or_else(|| {
            warn!(user_id = %user.id, "Token subject no longer exists");
            AuthError::UserNotFound
        })?;

    let links = state
        .identity_store
        .auths_for_user(&user.id)
        .await
        .map_err(AuthError::from)?;
    let catalog = state.providers.get_all().await?;

    let mut providers: Vec<String> = links
        .iter()
        .filter_map(|link| {
            catalog
                .iter()
                .find(|p| p.id == link.auth_provider_id)
                .map(|p| p.name.clone())
        })
        .collect();
    providers.sort();
    providers.dedup();

    Ok(Json(SuccessResponse::new(
        "User information retrieved successfully",
        MeResponse {
            user: account,
            providers,
        },
    )))
}

#[derive(Serialize)]
pub struct OtpIssued {
    pub provider: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct OtpVerified {
    pub provider: String,
    pub verified_at: Option<DateTime<Utc>>,
}

async fn resolve_otp_provider(
    state: &AppState,
    raw: &str,
) -> Result<(ProviderKind, String), ApiError> {
    let mut result = ValidationResult::new();
    let kind = match parse_otp_provider(&mut result, raw) {
        Some(kind) => kind,
        None => return Err(result.into()),
    };
    let provider = state.providers.get(kind).await?;
    Ok((kind, provider.id))
}

/// POST /api/v1/otp/generate
pub async fn otp_generate_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    payload: Result<Json<OtpGenerateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    check(&payload)?;

    let state = state_lock.read().await.clone();
    let (kind, provider_id) = resolve_otp_provider(&state, &payload.provider).await?;

    let account = state
        .identity_store
        .user_by_id(&user.id)
        .await
        .map_err(AuthError::from)?
        .ok_or(AuthError::UserNotFound)?;

    let destination = match kind {
        ProviderKind::MobileOtp => state
            .identity_store
            .auths_for_user(&account.id)
            .await
            .map_err(AuthError::from)?
            .iter()
            .find_map(|link| link.provider_data.mobile().map(str::to_string))
            .ok_or_else(|| AuthError::MissingChannel("mobile number".to_string()))?,
        _ => account.email.clone(),
    };

    let link = state
        .otp()
        .generate(&account.id, &provider_id, &account.email)
        .await?;

    if let Some(code) = link.otp_code.as_deref() {
        state.otp_delivery.deliver(kind, &destination, code).await?;
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(SuccessResponse::new(
            "OTP sent",
            OtpIssued {
                provider: kind.to_string(),
                expires_at: link.otp_expires_at,
            },
        )),
    ))
}

/// POST /api/v1/otp/verify
pub async fn otp_verify_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    payload: Result<Json<OtpVerifyRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse<OtpVerified>>, ApiError> {
    let Json(payload) = payload?;
    check(&payload)?;

    let state = state_lock.read().await.clone();
    let (kind, provider_id) = resolve_otp_provider(&state, &payload.provider).await?;

    let link = state
        .otp()
        .verify(&user.id, &provider_id, payload.code.trim())
        .await?;

    Ok(Json(SuccessResponse::new(
        "OTP verified successfully",
        OtpVerified {
            provider: kind.to_string(),
            verified_at: link.verified_at,
        },
    )))
}

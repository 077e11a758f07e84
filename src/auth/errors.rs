//! Error taxonomy for the authentication flows

use thiserror::Error;
use tracing::{error, warn};

use super::store::{Constraint, StoreError};
use super::token::TokenError;
use crate::common::ApiError;
use crate::services::google::GoogleError;

/// Message shared by every local-login failure so callers cannot tell
/// an unknown username from a wrong password.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email already exists")]
    EmailExists,

    #[error("username already exists")]
    UsernameTaken,

    #[error("this login is already linked to an account")]
    AlreadyLinked,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("auth provider not found: {0}")]
    ProviderNotFound(String),

    #[error("user not found")]
    UserNotFound,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("OTP has expired")]
    OtpExpired,

    #[error("too many OTP attempts")]
    TooManyAttempts,

    #[error("invalid OTP")]
    InvalidOtp,

    #[error("no delivery channel for {0}")]
    MissingChannel(String),

    #[error("record was updated concurrently")]
    ConcurrentUpdate,

    #[error("password hashing failed")]
    HashingFailed,

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("identity provider rejected the login: {0}")]
    OAuthRejected(String),

    #[error("identity provider unavailable: {0}")]
    IdpUnavailable(String),

    #[error("identity provider is not configured")]
    IdpNotConfigured,

    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::StaleWrite => AuthError::ConcurrentUpdate,
            StoreError::Duplicate(Constraint::Email) => AuthError::EmailExists,
            StoreError::Duplicate(Constraint::ProviderSubject) => AuthError::AlreadyLinked,
            StoreError::Duplicate(Constraint::ProviderUsername) => AuthError::UsernameTaken,
            other => AuthError::Store(other),
        }
    }
}

impl From<GoogleError> for AuthError {
    fn from(e: GoogleError) -> Self {
        match e {
            GoogleError::NotConfigured => AuthError::IdpNotConfigured,
            GoogleError::Timeout => AuthError::IdpUnavailable("request timed out".to_string()),
            other => AuthError::OAuthRejected(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::EmailExists => ApiError::Conflict("Email already exists".to_string()),
            AuthError::UsernameTaken => ApiError::Conflict("Username already exists".to_string()),
            AuthError::AlreadyLinked => {
                ApiError::Conflict("This login is already linked to an account".to_string())
            }
            AuthError::ConcurrentUpdate => ApiError::Conflict(
                "The record was modified by another request, please retry".to_string(),
            ),
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string())
            }
            AuthError::InvalidOtp => ApiError::Unauthorized("Invalid OTP".to_string()),
            AuthError::OAuthRejected(reason) => {
                warn!(reason = %reason, "OAuth login rejected");
                ApiError::Unauthorized("Failed to authenticate with identity provider".to_string())
            }
            AuthError::Token(TokenError::Signing(reason)) => {
                error!(reason = %reason, "Token signing failed");
                ApiError::InternalServer("Failed to issue token".to_string())
            }
            AuthError::Token(_) => ApiError::Unauthorized("Invalid or expired token".to_string()),
            AuthError::UserNotFound => ApiError::NotFound("User not found".to_string()),
            AuthError::AccountDisabled => {
                ApiError::Unauthorized("Account is disabled".to_string())
            }
            AuthError::OtpExpired => ApiError::Gone("OTP has expired".to_string()),
            AuthError::TooManyAttempts => {
                ApiError::TooManyRequests("Too many OTP attempts".to_string())
            }
            AuthError::MissingChannel(channel) => {
                ApiError::BadRequest(format!("No {} on file for this account", channel))
            }
            AuthError::IdpUnavailable(reason) => {
                warn!(reason = %reason, "Identity provider unavailable");
                ApiError::ServiceUnavailable("Identity provider is unavailable".to_string())
            }
            AuthError::IdpNotConfigured => {
                ApiError::ServiceUnavailable("Google login is not configured".to_string())
            }
            AuthError::ProviderNotFound(name) => {
                error!(provider = %name, "Auth provider missing from catalog");
                ApiError::InternalServer("Authentication provider is not available".to_string())
            }
            AuthError::HashingFailed => {
                error!("Password hashing failed");
                ApiError::InternalServer("Failed to process credentials".to_string())
            }
            AuthError::Store(StoreError::Database(db)) => ApiError::DatabaseError(db),
            AuthError::Store(other) => {
                error!(error = %other, "Identity store failure");
                ApiError::InternalServer("Storage operation failed".to_string())
            }
        }
    }
}

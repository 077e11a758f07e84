//! Authentication data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_ROLE: &str = "user";

/// User database model
#[derive(FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub country: Option<String>,
    #[serde(skip_serializing)]
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog entry naming an authentication method
#[derive(FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct AuthProvider {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The canonical provider names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Local,
    Google,
    Facebook,
    Apple,
    MobileOtp,
    EmailOtp,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::Local,
        ProviderKind::Google,
        ProviderKind::Facebook,
        ProviderKind::Apple,
        ProviderKind::MobileOtp,
        ProviderKind::EmailOtp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::Google => "google",
            ProviderKind::Facebook => "facebook",
            ProviderKind::Apple => "apple",
            ProviderKind::MobileOtp => "mobile_otp",
            ProviderKind::EmailOtp => "email_otp",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Local => "Local Authentication",
            ProviderKind::Google => "Google OAuth",
            ProviderKind::Facebook => "Facebook OAuth",
            ProviderKind::Apple => "Apple Sign In",
            ProviderKind::MobileOtp => "Mobile OTP",
            ProviderKind::EmailOtp => "Email OTP",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ProviderKind::Local => "Username/password authentication",
            ProviderKind::Google => "Google OAuth 2.0 authentication",
            ProviderKind::Facebook => "Facebook OAuth 2.0 authentication",
            ProviderKind::Apple => "Apple Sign In authentication",
            ProviderKind::MobileOtp => "Mobile phone OTP authentication",
            ProviderKind::EmailOtp => "Email OTP authentication",
        }
    }

    pub fn is_otp(&self) -> bool {
        matches!(self, ProviderKind::MobileOtp | ProviderKind::EmailOtp)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown auth provider '{}'", s))
    }
}

/// Profile snapshot fetched from an OAuth identity provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

/// Provider-specific payload of a `UserAuth` link.
///
/// Stored as JSON text in `user_auth.provider_data`; only the storage layer
/// sees the serialized form. Column content that does not parse is kept as
/// `Unreadable` and never yields a password hash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ProviderData {
    #[serde(rename = "local_credentials")]
    LocalCredentials {
        password_hash: String,
        #[serde(default)]
        mobile: Option<String>,
    },
    #[serde(rename = "oauth_profile")]
    OAuthProfile(OAuthProfile),
    #[default]
    #[serde(rename = "empty")]
    Empty,
    #[serde(skip)]
    Unreadable(String),
}

impl ProviderData {
    pub fn from_column(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => ProviderData::Empty,
            Some(text) => serde_json::from_str(text)
                .unwrap_or_else(|_| ProviderData::Unreadable(text.to_string())),
        }
    }

    pub fn to_column(&self) -> Result<Option<String>, serde_json::Error> {
        match self {
            ProviderData::Empty => Ok(None),
            ProviderData::Unreadable(raw) => Ok(Some(raw.clone())),
            other => serde_json::to_string(other).map(Some),
        }
    }

    pub fn password_hash(&self) -> Option<&str> {
        match self {
            ProviderData::LocalCredentials { password_hash, .. } if !password_hash.is_empty() => {
                Some(password_hash)
            }
            _ => None,
        }
    }

    pub fn mobile(&self) -> Option<&str> {
        match self {
            ProviderData::LocalCredentials { mobile, .. } => {
                mobile.as_deref().filter(|m| !m.is_empty())
            }
            _ => None,
        }
    }
}

/// Link between a user and the provider they authenticated with
#[derive(Debug, Clone, PartialEq)]
pub struct UserAuth {
    pub id: String,
    pub user_id: String,
    pub auth_provider_id: String,
    pub provider_user_id: Option<String>,
    pub provider_email: Option<String>,
    pub username: Option<String>,
    pub provider_data: ProviderData,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub otp_code: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub otp_attempts: i64,
    /// Optimistic concurrency token, bumped by every store update
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---- Request / response payloads ----

#[derive(Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub mobile: String,
    pub display_name: String,
    pub password: String,
    pub country: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Authorization code returned to the client by Google's consent screen
#[derive(Deserialize, Debug, Clone)]
pub struct GoogleLoginRequest {
    pub code: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct OtpGenerateRequest {
    pub provider: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct OtpVerifyRequest {
    pub provider: String,
    pub code: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Serialize, Debug)]
pub struct SuccessResponse<T: Serialize> {
    pub message: String,
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(message: &str, data: T) -> Self {
        Self {
            message: message.to_string(),
            data,
        }
    }
}

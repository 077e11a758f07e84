// src/services/google.rs
//! Google OAuth 2.0 client: consent URL, code exchange and userinfo

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::common::config::GoogleOAuthConfig;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Google OAuth not configured")]
    NotConfigured,

    #[error("OAuth flow failed: {0}")]
    OAuthFailed(String),

    #[error("Request to Google timed out")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<reqwest::Error> for GoogleError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GoogleError::Timeout
        } else if e.is_decode() {
            GoogleError::SerializationError(e.to_string())
        } else {
            GoogleError::RequestFailed(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Subset of the v2 userinfo document
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
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

/// The identity-provider side of an authorization-code login
#[async_trait]
pub trait OAuthIdentityProvider: Send + Sync {
    fn authorization_url(&self, state: &str) -> String;

    /// Trade a one-time code for an access token
    async fn exchange_code(&self, code: &str) -> Result<String, GoogleError>;

    async fn fetch_profile(&self, access_token: &str) -> Result<GoogleUserInfo, GoogleError>;
}

#[derive(Debug, Clone)]
pub struct GoogleOAuthClient {
    config: GoogleOAuthConfig,
    client: Client,
}

impl GoogleOAuthClient {
    pub fn new(config: GoogleOAuthConfig, timeout: Duration) -> Result<Self, GoogleError> {
        if !config.is_configured() {
            return Err(GoogleError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GoogleError::RequestFailed(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl OAuthIdentityProvider for GoogleOAuthClient {
    fn authorization_url(&self, state: &str) -> String {
        let scope_param = SCOPES.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&state={}",
            AUTH_ENDPOINT,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_url),
            urlencoding::encode(&scope_param),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<String, GoogleError> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self.client.post(TOKEN_ENDPOINT).form(&params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Token exchange failed");
            return Err(GoogleError::OAuthFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let tokens = response.json::<TokenResponse>().await?;
        info!("Successfully exchanged authorization code for tokens");
        Ok(tokens.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<GoogleUserInfo, GoogleError> {
        let response = self
            .client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            error!(status = %status, "Failed to fetch Google user info");
            return Err(GoogleError::OAuthFailed(format!(
                "userinfo returned HTTP {}",
                status
            )));
        }

        Ok(response.json::<GoogleUserInfo>().await?)
    }
}

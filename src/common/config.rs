// src/common/config.rs
//! Process configuration loaded from the environment

use std::env;
use std::time::Duration;

const DEFAULT_JWT_SECRET: &str = "default-secret-key";
const DEFAULT_TOKEN_EXP_MINUTES: i64 = 15;
/// One year
const MAX_TOKEN_EXP_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub database_url: String,
    pub database_type: String,
    pub token_exp_minutes: i64,
    pub port: u16,
    pub google: GoogleOAuthConfig,
    pub oauth_timeout: Duration,
    pub cors_origins: Vec<String>,
    pub reset_db: bool,
}

#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

impl GoogleOAuthConfig {
    /// Google login is only offered when both client credentials are present
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            database_url: "sqlite://iam_service.db".to_string(),
            database_type: "sqlite".to_string(),
            token_exp_minutes: DEFAULT_TOKEN_EXP_MINUTES,
            port: 8091,
            google: GoogleOAuthConfig {
                client_id: String::new(),
                client_secret: String::new(),
                redirect_url: "http://localhost:3000/auth/google/callback".to_string(),
            },
            oauth_timeout: Duration::from_secs(10),
            cors_origins: vec!["*".to_string()],
            reset_db: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secret) = non_empty_var("JWT_SECRET") {
            config.jwt_secret = secret;
        }

        if let Some(url) = non_empty_var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Some(kind) = non_empty_var("DATABASE_TYPE") {
            config.database_type = kind.to_lowercase();
        }

        if let Some(minutes) = parsed_var::<i64>("TOKEN_EXP_MINUTES") {
            config.token_exp_minutes = token_minutes(minutes);
        }

        if let Some(port) = parsed_var::<u16>("PORT") {
            config.port = port;
        }

        if let Some(client_id) = non_empty_var("GOOGLE_CLIENT_ID") {
            config.google.client_id = client_id;
        }
        if let Some(client_secret) = non_empty_var("GOOGLE_CLIENT_SECRET") {
            config.google.client_secret = client_secret;
        }
        if let Some(redirect_url) = non_empty_var("GOOGLE_REDIRECT_URL") {
            config.google.redirect_url = redirect_url;
        }

        if let Some(secs) = parsed_var::<u64>("OAUTH_TIMEOUT_SECS") {
            config.oauth_timeout = Duration::from_secs(secs);
        }

        if let Some(origins) = non_empty_var("CORS_ORIGINS") {
            config.cors_origins = parse_origins(&origins);
        }

        config.reset_db = env::var("RESET_DB")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        config
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(token_minutes(self.token_exp_minutes))
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

/// Non-positive values fall back to the default, large ones are capped
fn token_minutes(minutes: i64) -> i64 {
    if minutes <= 0 {
        DEFAULT_TOKEN_EXP_MINUTES
    } else {
        minutes.min(MAX_TOKEN_EXP_MINUTES)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    non_empty_var(key).and_then(|v| v.trim().parse::<T>().ok())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_contract() {
        let config = Config::default();
        assert_eq!(config.token_exp_minutes, 15);
        assert_eq!(config.port, 8091);
        assert_eq!(config.database_type, "sqlite");
        assert_eq!(config.token_ttl(), chrono::Duration::minutes(15));
        assert!(config.uses_default_secret());
        assert!(!config.google.is_configured());
    }

    #[test]
    fn test_google_requires_both_credentials() {
        let mut google = Config::default().google;
        google.client_id = "client".to_string();
        assert!(!google.is_configured());
        google.client_secret = "secret".to_string();
        assert!(google.is_configured());
    }

    #[test]
    fn test_token_lifetime_is_bounded() {
        assert_eq!(token_minutes(30), 30);
        assert_eq!(token_minutes(0), 15);
        assert_eq!(token_minutes(-5), 15);
        assert_eq!(token_minutes(i64::MAX), MAX_TOKEN_EXP_MINUTES);

        let config = Config {
            token_exp_minutes: i64::MAX,
            ..Config::default()
        };
        assert_eq!(config.token_ttl(), chrono::Duration::days(365));
    }

    #[test]
    fn test_parse_origins_skips_blanks() {
        let origins = parse_origins("http://a.test, ,http://b.test,");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }
}

// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

use super::config::Config;
use crate::auth::linker::IdentityLinker;
use crate::auth::local::LocalAuth;
use crate::auth::oauth::GoogleAuth;
use crate::auth::otp::{OtpDelivery, OtpService, TracingDelivery};
use crate::auth::password::CredentialHasher;
use crate::auth::providers::ProviderRegistry;
use crate::auth::session::SessionIssuer;
use crate::auth::sqlite_store::SqliteIdentityStore;
use crate::auth::store::IdentityStore;
use crate::auth::token::TokenManager;
use crate::services::google::{GoogleError, GoogleOAuthClient, OAuthIdentityProvider};

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenManager>,
    pub hasher: CredentialHasher,
    pub identity_store: Arc<dyn IdentityStore>,
    pub providers: ProviderRegistry,
    /// `None` when Google credentials are not configured
    pub google: Option<Arc<dyn OAuthIdentityProvider>>,
    pub otp_delivery: Arc<dyn OtpDelivery>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Config) -> Result<Self, GoogleError> {
        let store = Arc::new(SqliteIdentityStore::new(db.clone()));

        let google: Option<Arc<dyn OAuthIdentityProvider>> = if config.google.is_configured() {
            info!("Google OAuth enabled");
            Some(Arc::new(GoogleOAuthClient::new(
                config.google.clone(),
                config.oauth_timeout,
            )?))
        } else {
            warn!("GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set, Google login disabled");
            None
        };

        Ok(Self {
            db,
            tokens: Arc::new(TokenManager::new(&config.jwt_secret, config.token_ttl())),
            hasher: CredentialHasher::default(),
            identity_store: store.clone(),
            providers: ProviderRegistry::new(store),
            google,
            otp_delivery: Arc::new(TracingDelivery),
            config: Arc::new(config),
        })
    }

    pub fn sessions(&self) -> SessionIssuer {
        SessionIssuer::new(self.tokens.clone())
    }

    pub fn linker(&self) -> IdentityLinker {
        IdentityLinker::new(self.identity_store.clone(), self.providers.clone())
    }

    pub fn local_auth(&self) -> LocalAuth {
        LocalAuth::new(
            self.identity_store.clone(),
            self.providers.clone(),
            self.linker(),
            self.hasher,
            self.sessions(),
        )
    }

    pub fn google_auth(&self) -> Option<GoogleAuth> {
        self.google
            .clone()
            .map(|idp| GoogleAuth::new(idp, self.linker(), self.sessions()))
    }

    pub fn otp(&self) -> OtpService {
        OtpService::new(self.identity_store.clone())
    }
}

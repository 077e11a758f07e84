//! Username/password registration and login

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::errors::AuthError;
use super::linker::{normalize_email, IdentityAssertion, IdentityLinker, ProfileFields};
use super::models::{AuthResponse, ProviderData, ProviderKind, RegisterRequest};
use super::password::CredentialHasher;
use super::providers::ProviderRegistry;
use super::session::SessionIssuer;
use super::store::IdentityStore;
use crate::common::safe_email_log;

#[derive(Clone)]
pub struct LocalAuth {
    store: Arc<dyn IdentityStore>,
    providers: ProviderRegistry,
    linker: IdentityLinker,
    hasher: CredentialHasher,
    sessions: SessionIssuer,
}

impl LocalAuth {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        providers: ProviderRegistry,
        linker: IdentityLinker,
        hasher: CredentialHasher,
        sessions: SessionIssuer,
    ) -> Self {
        Self {
            store,
            providers,
            linker,
            hasher,
            sessions,
        }
    }

    /// Create an account with a local credential link and sign a token for it
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(&req.email);

        if self.store.user_by_email(&email).await?.is_some() {
            warn!(email = %safe_email_log(&email), "Registration rejected: email already exists");
            return Err(AuthError::EmailExists);
        }

        let password_hash = self.hasher.hash_blocking(req.password).await?;

        let assertion = IdentityAssertion {
            provider: ProviderKind::Local,
            external_id: None,
            email,
            username: Some(req.username.trim().to_string()),
            profile: ProfileFields {
                display_name: Some(req.display_name.trim().to_string()),
                avatar_url: None,
                country: Some(req.country.trim().to_string()),
            },
            provider_data: ProviderData::LocalCredentials {
                password_hash,
                mobile: Some(req.mobile.trim().to_string()),
            },
        };

        let linked = self.linker.create_account(assertion).await?;
        info!(
            user_id = %linked.user.id,
            email = %safe_email_log(&linked.user.email),
            "User registered"
        );

        self.sessions.respond(linked.user)
    }

    /// Every failure short of an infrastructure error collapses into
    /// `InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let provider = match self.providers.get(ProviderKind::Local).await {
            Ok(p) => p,
            Err(AuthError::ProviderNotFound(_)) => {
                warn!("Login rejected: local provider unavailable");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        let link = self
            .store
            .auth_by_username(&provider.id, username.trim())
            .await?
            .ok_or_else(|| {
                debug!("Login rejected: unknown username");
                AuthError::InvalidCredentials
            })?;

        let digest = link
            .provider_data
            .password_hash()
            .ok_or_else(|| {
                warn!(link_id = %link.id, "Login rejected: local link has no readable credentials");
                AuthError::InvalidCredentials
            })?
            .to_string();

        if !self
            .hasher
            .verify_blocking(password.to_string(), digest)
            .await
        {
            debug!(link_id = %link.id, "Login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .user_by_id(&link.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::InvalidCredentials)?;

        info!(user_id = %user.id, "User logged in with password");
        self.sessions.respond(user)
    }
}

//! Google authorization-code login

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::AuthError;
use super::linker::{IdentityAssertion, IdentityLinker, LinkOutcome, ProfileFields};
use super::models::{AuthResponse, OAuthProfile, ProviderData, ProviderKind};
use super::session::SessionIssuer;
use crate::common::safe_email_log;
use crate::services::google::{GoogleUserInfo, OAuthIdentityProvider};

#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthorizationRedirect {
    pub url: String,
    pub state: String,
}

#[derive(Clone)]
pub struct GoogleAuth {
    idp: Arc<dyn OAuthIdentityProvider>,
    linker: IdentityLinker,
    sessions: SessionIssuer,
}

impl GoogleAuth {
    pub fn new(
        idp: Arc<dyn OAuthIdentityProvider>,
        linker: IdentityLinker,
        sessions: SessionIssuer,
    ) -> Self {
        Self {
            idp,
            linker,
            sessions,
        }
    }

    pub fn authorization_url(&self) -> AuthorizationRedirect {
        let state = Uuid::new_v4().simple().to_string();
        AuthorizationRedirect {
            url: self.idp.authorization_url(&state),
            state,
        }
    }

    pub async fn login(&self, code: &str) -> Result<AuthResponse, AuthError> {
        let access_token = self.idp.exchange_code(code).await?;
        let info = self.idp.fetch_profile(&access_token).await?;

        if info.id.trim().is_empty() || info.email.trim().is_empty() {
            return Err(AuthError::OAuthRejected(
                "profile is missing subject or email".to_string(),
            ));
        }

        debug!(
            google_id = %info.id,
            email = %safe_email_log(&info.email),
            verified_email = info.verified_email,
            "Fetched Google profile"
        );

        let linked = self.linker.resolve(assertion_from(info)).await?;

        match linked.outcome {
            LinkOutcome::Created => info!(user_id = %linked.user.id, "New user created via Google"),
            LinkOutcome::MergedByEmail => {
                info!(user_id = %linked.user.id, "Google login linked to existing account")
            }
            LinkOutcome::ExistingLink => {
                info!(user_id = %linked.user.id, "Existing Google user logged in")
            }
        }

        self.sessions.respond(linked.user)
    }
}

fn assertion_from(info: GoogleUserInfo) -> IdentityAssertion {
    IdentityAssertion {
        provider: ProviderKind::Google,
        external_id: Some(info.id),
        email: info.email,
        username: None,
        profile: ProfileFields {
            display_name: info.name.clone(),
            avatar_url: info.picture.clone(),
            country: None,
        },
        provider_data: ProviderData::OAuthProfile(OAuthProfile {
            name: info.name,
            given_name: info.given_name,
            family_name: info.family_name,
            picture: info.picture,
            locale: info.locale,
        }),
    }
}

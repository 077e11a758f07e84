//! Maps an asserted external identity onto exactly one user account
//!
//! Resolution order:
//! 1. a link for (provider, external id) wins outright;
//! 2. otherwise an account with the same email gets a new link attached;
//! 3. otherwise a fresh user and link are created in one transaction.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::errors::AuthError;
use super::models::{ProviderData, ProviderKind, User, UserAuth, DEFAULT_ROLE};
use super::providers::ProviderRegistry;
use super::store::IdentityStore;
use crate::common::{generate_user_auth_id, generate_user_id, safe_email_log};

/// Profile attributes a provider may assert about a person
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IdentityAssertion {
    pub provider: ProviderKind,
    pub external_id: Option<String>,
    pub email: String,
    pub username: Option<String>,
    pub profile: ProfileFields,
    pub provider_data: ProviderData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    ExistingLink,
    MergedByEmail,
    Created,
}

#[derive(Debug, Clone)]
pub struct LinkedIdentity {
    pub user: User,
    pub link: UserAuth,
    pub outcome: LinkOutcome,
}

/// Lowercased, trimmed form used for every email comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct IdentityLinker {
    store: Arc<dyn IdentityStore>,
    providers: ProviderRegistry,
}

impl IdentityLinker {
    pub fn new(store: Arc<dyn IdentityStore>, providers: ProviderRegistry) -> Self {
        Self { store, providers }
    }

    pub async fn resolve(&self, assertion: IdentityAssertion) -> Result<LinkedIdentity, AuthError> {
        let provider = self.providers.get(assertion.provider).await?;

        if let Some(external_id) = assertion.external_id.as_deref() {
            if let Some(link) = self.store.auth_by_external_id(&provider.id, external_id).await? {
                let user = self
                    .store
                    .user_by_id(&link.user_id)
                    .await?
                    .ok_or(AuthError::UserNotFound)?;
                ensure_active(&user)?;
                let user = self.sync_profile(user, &assertion.profile).await?;
                let link = self.refresh_link(link, &assertion).await?;
                return Ok(LinkedIdentity {
                    user,
                    link,
                    outcome: LinkOutcome::ExistingLink,
                });
            }
        }

        let email = normalize_email(&assertion.email);
        if let Some(user) = self.store.user_by_email(&email).await? {
            ensure_active(&user)?;
            warn!(
                user_id = %user.id,
                email = %safe_email_log(&email),
                provider = %assertion.provider,
                "Attaching new login method to existing account by email match"
            );
            let link = new_link(&user.id, &provider.id, &assertion, Utc::now());
            self.store.create_user_auth(&link).await?;
            let user = self.sync_profile(user, &assertion.profile).await?;
            return Ok(LinkedIdentity {
                user,
                link,
                outcome: LinkOutcome::MergedByEmail,
            });
        }

        self.insert_account(&provider.id, &assertion).await
    }

    /// Create a brand-new account without the email-merge fallback.
    /// An existing email surfaces as `EmailExists`.
    pub async fn create_account(
        &self,
        assertion: IdentityAssertion,
    ) -> Result<LinkedIdentity, AuthError> {
        let provider = self.providers.get(assertion.provider).await?;
        self.insert_account(&provider.id, &assertion).await
    }

    async fn insert_account(
        &self,
        provider_id: &str,
        assertion: &IdentityAssertion,
    ) -> Result<LinkedIdentity, AuthError> {
        let now = Utc::now();
        let email = normalize_email(&assertion.email);
        let user = User {
            id: generate_user_id(),
            display_name: assertion
                .profile
                .display_name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| default_display_name(&email)),
            email,
            avatar_url: assertion.profile.avatar_url.clone(),
            country: assertion.profile.country.clone(),
            role: DEFAULT_ROLE.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let link = new_link(&user.id, provider_id, assertion, now);

        self.store.create_user_with_auth(&user, &link).await?;
        info!(
            user_id = %user.id,
            provider = %assertion.provider,
            "Created new account"
        );

        Ok(LinkedIdentity {
            user,
            link,
            outcome: LinkOutcome::Created,
        })
    }

    async fn sync_profile(&self, mut user: User, profile: &ProfileFields) -> Result<User, AuthError> {
        let mut changed = false;

        if let Some(name) = non_blank(&profile.display_name) {
            if user.display_name != name {
                user.display_name = name.to_string();
                changed = true;
            }
        }
        if let Some(avatar) = non_blank(&profile.avatar_url) {
            if user.avatar_url.as_deref() != Some(avatar) {
                user.avatar_url = Some(avatar.to_string());
                changed = true;
            }
        }

        if changed {
            user.updated_at = Utc::now();
            self.store.update_user(&user).await?;
        }
        Ok(user)
    }

    async fn refresh_link(
        &self,
        mut link: UserAuth,
        assertion: &IdentityAssertion,
    ) -> Result<UserAuth, AuthError> {
        if assertion.provider_data != ProviderData::Empty {
            link.provider_data = assertion.provider_data.clone();
        }
        link.provider_email = Some(normalize_email(&assertion.email));
        link.is_verified = true;
        link.verified_at.get_or_insert_with(Utc::now);

        Ok(self.store.update_user_auth(&link).await?)
    }
}

fn new_link(
    user_id: &str,
    provider_id: &str,
    assertion: &IdentityAssertion,
    now: DateTime<Utc>,
) -> UserAuth {
    UserAuth {
        id: generate_user_auth_id(),
        user_id: user_id.to_string(),
        auth_provider_id: provider_id.to_string(),
        provider_user_id: assertion.external_id.clone(),
        provider_email: Some(normalize_email(&assertion.email)),
        username: assertion.username.clone(),
        provider_data: assertion.provider_data.clone(),
        is_verified: true,
        verified_at: Some(now),
        otp_code: None,
        otp_expires_at: None,
        otp_attempts: 0,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

fn ensure_active(user: &User) -> Result<(), AuthError> {
    if user.is_active {
        Ok(())
    } else {
        warn!(user_id = %user.id, "Login rejected: account is disabled");
        Err(AuthError::AccountDisabled)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory_store::MemoryIdentityStore;
    use crate::auth::models::OAuthProfile;

    async fn linker() -> (IdentityLinker, Arc<MemoryIdentityStore>) {
        let store = Arc::new(MemoryIdentityStore::new());
        let providers = ProviderRegistry::new(store.clone());
        providers.ensure_defaults().await.unwrap();
        (IdentityLinker::new(store.clone(), providers), store)
    }

    fn google(sub: &str, email: &str, name: &str, picture: Option<&str>) -> IdentityAssertion {
        IdentityAssertion {
            provider: ProviderKind::Google,
            external_id: Some(sub.to_string()),
            email: email.to_string(),
            username: None,
            profile: ProfileFields {
                display_name: Some(name.to_string()),
                avatar_url: picture.map(str::to_string),
                country: None,
            },
            provider_data: ProviderData::OAuthProfile(OAuthProfile {
                name: Some(name.to_string()),
                picture: picture.map(str::to_string),
                ..Default::default()
            }),
        }
    }

    fn local(username: &str, email: &str) -> IdentityAssertion {
        IdentityAssertion {
            provider: ProviderKind::Local,
            external_id: None,
            email: email.to_string(),
            username: Some(username.to_string()),
            profile: ProfileFields {
                display_name: Some("Local Name".to_string()),
                avatar_url: None,
                country: Some("IN".to_string()),
            },
            provider_data: ProviderData::LocalCredentials {
                password_hash: "$2b$04$abc".to_string(),
                mobile: None,
            },
        }
    }

    #[tokio::test]
    async fn test_first_login_creates_account() {
        let (linker, store) = linker().await;

        let linked = linker
            .resolve(google("g-1", "New@Example.com", "New Person", None))
            .await
            .unwrap();

        assert_eq!(linked.outcome, LinkOutcome::Created);
        assert_eq!(linked.user.email, "new@example.com");
        assert_eq!(linked.user.display_name, "New Person");
        assert_eq!(linked.user.role, DEFAULT_ROLE);
        assert!(linked.link.is_verified);
        assert!(linked.link.verified_at.is_some());
        assert_eq!(store.user_count(), 1);
        assert_eq!(store.link_count(), 1);
    }

    #[tokio::test]
    async fn test_repeat_login_resolves_existing_link_and_syncs_profile() {
        let (linker, store) = linker().await;
        let first = linker
            .resolve(google("g-1", "a@example.com", "Alice", Some("http://img/1")))
            .await
            .unwrap();

        let second = linker
            .resolve(google("g-1", "a@example.com", "Alice Cooper", Some("http://img/2")))
            .await
            .unwrap();

        assert_eq!(second.outcome, LinkOutcome::ExistingLink);
        assert_eq!(second.user.id, first.user.id);
        assert_eq!(second.user.display_name, "Alice Cooper");
        assert_eq!(second.user.avatar_url.as_deref(), Some("http://img/2"));
        assert_eq!(second.link.version, first.link.version + 1);
        assert_eq!(store.user_count(), 1);
        assert_eq!(store.link_count(), 1);

        let stored = store.user_by_id(&first.user.id).await.unwrap().unwrap();
        assert_eq!(stored.display_name, "Alice Cooper");
    }

    #[tokio::test]
    async fn test_missing_profile_fields_do_not_clear_user() {
        let (linker, _) = linker().await;
        linker
            .resolve(google("g-1", "a@example.com", "Alice", Some("http://img/1")))
            .await
            .unwrap();

        let again = linker
            .resolve(google("g-1", "a@example.com", "Alice", None))
            .await
            .unwrap();

        assert_eq!(again.user.avatar_url.as_deref(), Some("http://img/1"));
    }

    #[tokio::test]
    async fn test_email_match_attaches_new_provider() {
        let (linker, store) = linker().await;
        let registered = linker.create_account(local("alice", "a@example.com")).await.unwrap();

        let via_google = linker
            .resolve(google("g-9", "A@example.com", "Alice G", Some("http://img/g")))
            .await
            .unwrap();

        assert_eq!(via_google.outcome, LinkOutcome::MergedByEmail);
        assert_eq!(via_google.user.id, registered.user.id);
        assert_eq!(via_google.user.avatar_url.as_deref(), Some("http://img/g"));
        assert_eq!(store.user_count(), 1);
        assert_eq!(store.auths_for_user(&registered.user.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_disabled_account_cannot_sign_in_or_gain_links() {
        let (linker, store) = linker().await;
        let first = linker
            .resolve(google("g-1", "a@example.com", "Alice", None))
            .await
            .unwrap();

        let mut user = first.user.clone();
        user.is_active = false;
        store.update_user(&user).await.unwrap();

        assert!(matches!(
            linker.resolve(google("g-1", "a@example.com", "Alice", None)).await,
            Err(AuthError::AccountDisabled)
        ));
        assert!(matches!(
            linker.resolve(google("g-2", "a@example.com", "Alice", None)).await,
            Err(AuthError::AccountDisabled)
        ));
        assert_eq!(store.link_count(), 1);
    }

    #[tokio::test]
    async fn test_create_account_rejects_existing_email() {
        let (linker, store) = linker().await;
        linker.create_account(local("alice", "a@example.com")).await.unwrap();

        let err = linker
            .create_account(local("alice2", "a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailExists));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_create_account_rejects_taken_username_without_orphan_user() {
        let (linker, store) = linker().await;
        linker.create_account(local("alice", "a@example.com")).await.unwrap();

        let err = linker
            .create_account(local("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
        assert_eq!(store.user_count(), 1);
        assert!(store.user_by_email("other@example.com").await.unwrap().is_none());
    }
}

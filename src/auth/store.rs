//! Persistence seams for identities and the provider catalog
//!
//! The auth flows only talk to these traits. `SqliteIdentityStore` is the
//! production backend; tests use an in-memory fake with the same uniqueness
//! rules.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{AuthProvider, User, UserAuth};

/// Which uniqueness rule a write collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Email,
    ProviderSubject,
    ProviderUsername,
    ProviderName,
    RoleName,
    Other,
}

impl Constraint {
    /// Classify SQLite's "UNIQUE constraint failed: table.col, ..." message
    pub fn from_message(message: &str) -> Self {
        if message.contains("users.email") {
            Constraint::Email
        } else if message.contains("user_auth.provider_user_id") {
            Constraint::ProviderSubject
        } else if message.contains("user_auth.username") {
            Constraint::ProviderUsername
        } else if message.contains("auth_providers.name") {
            Constraint::ProviderName
        } else if message.contains("roles.role") {
            Constraint::RoleName
        } else {
            Constraint::Other
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("duplicate value violates {0:?} uniqueness")]
    Duplicate(Constraint),

    #[error("record was modified concurrently")]
    StaleWrite,

    #[error("record not found")]
    NotFound,

    #[error("provider data could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate(Constraint::from_message(db_err.message()));
            }
        }
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn user_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn update_user(&self, user: &User) -> StoreResult<()>;

    /// Insert a user and its first link atomically. Either both rows exist
    /// afterwards or neither does.
    async fn create_user_with_auth(&self, user: &User, link: &UserAuth) -> StoreResult<()>;

    async fn create_user_auth(&self, link: &UserAuth) -> StoreResult<()>;

    async fn auth_by_external_id(
        &self,
        provider_id: &str,
        external_id: &str,
    ) -> StoreResult<Option<UserAuth>>;

    async fn auth_by_username(
        &self,
        provider_id: &str,
        username: &str,
    ) -> StoreResult<Option<UserAuth>>;

    async fn auth_by_user(&self, user_id: &str, provider_id: &str)
        -> StoreResult<Option<UserAuth>>;

    async fn auths_for_user(&self, user_id: &str) -> StoreResult<Vec<UserAuth>>;

    /// Compare-and-swap on `link.version`. Returns the stored copy with the
    /// bumped version, or `StaleWrite` if someone else updated it first.
    async fn update_user_auth(&self, link: &UserAuth) -> StoreResult<UserAuth>;
}

#[async_trait]
pub trait ProviderCatalog: Send + Sync {
    async fn all_providers(&self) -> StoreResult<Vec<AuthProvider>>;

    async fn provider_by_name(&self, name: &str) -> StoreResult<Option<AuthProvider>>;

    /// Insert all entries in one transaction
    async fn insert_providers(&self, providers: &[AuthProvider]) -> StoreResult<()>;
}

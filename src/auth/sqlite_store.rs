//! SQLite implementation of the identity store and provider catalog

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use super::models::{AuthProvider, ProviderData, User, UserAuth};
use super::store::{IdentityStore, ProviderCatalog, StoreError, StoreResult};

const USER_AUTH_COLUMNS: &str = "id, user_id, auth_provider_id, provider_user_id, provider_email, \
     username, provider_data, is_verified, verified_at, otp_code, otp_expires_at, otp_attempts, \
     version, created_at, updated_at";

/// Row shape of `user_auth`; `provider_data` is still raw JSON text here
#[derive(FromRow)]
struct UserAuthRow {
    id: String,
    user_id: String,
    auth_provider_id: String,
    provider_user_id: Option<String>,
    provider_email: Option<String>,
    username: Option<String>,
    provider_data: Option<String>,
    is_verified: bool,
    verified_at: Option<DateTime<Utc>>,
    otp_code: Option<String>,
    otp_expires_at: Option<DateTime<Utc>>,
    otp_attempts: i64,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserAuthRow> for UserAuth {
    fn from(row: UserAuthRow) -> Self {
        UserAuth {
            provider_data: ProviderData::from_column(row.provider_data.as_deref()),
            id: row.id,
            user_id: row.user_id,
            auth_provider_id: row.auth_provider_id,
            provider_user_id: row.provider_user_id,
            provider_email: row.provider_email,
            username: row.username,
            is_verified: row.is_verified,
            verified_at: row.verified_at,
            otp_code: row.otp_code,
            otp_expires_at: row.otp_expires_at,
            otp_attempts: row.otp_attempts,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct SqliteIdentityStore {
    db: SqlitePool,
}

impl SqliteIdentityStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn fetch_link(&self, filter: &str, binds: &[&str]) -> StoreResult<Option<UserAuth>> {
        let sql = format!("SELECT {} FROM user_auth WHERE {}", USER_AUTH_COLUMNS, filter);
        let mut query = sqlx::query_as::<_, UserAuthRow>(&sql);
        for value in binds {
            query = query.bind(*value);
        }
        let row = query.fetch_optional(&self.db).await?;
        Ok(row.map(UserAuth::from))
    }
}

async fn insert_user<'e, E>(executor: E, user: &User) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO users (id, email, display_name, avatar_url, country, role, is_active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.display_name)
    .bind(&user.avatar_url)
    .bind(&user.country)
    .bind(&user.role)
    .bind(user.is_active)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

async fn insert_link<'e, E>(executor: E, link: &UserAuth) -> StoreResult<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let provider_data = link.provider_data.to_column()?;
    sqlx::query(
        "INSERT INTO user_auth (id, user_id, auth_provider_id, provider_user_id, provider_email, username,
            provider_data, is_verified, verified_at, otp_code, otp_expires_at, otp_attempts, version,
            created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&link.id)
    .bind(&link.user_id)
    .bind(&link.auth_provider_id)
    .bind(&link.provider_user_id)
    .bind(&link.provider_email)
    .bind(&link.username)
    .bind(provider_data)
    .bind(link.is_verified)
    .bind(link.verified_at)
    .bind(&link.otp_code)
    .bind(link.otp_expires_at)
    .bind(link.otp_attempts)
    .bind(link.version)
    .bind(link.created_at)
    .bind(link.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET email = ?, display_name = ?, avatar_url = ?, country = ?, role = ?,
                is_active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .bind(&user.country)
        .bind(&user.role)
        .bind(user.is_active)
        .bind(user.updated_at)
        .bind(&user.id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_user_with_auth(&self, user: &User, link: &UserAuth) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        insert_user(&mut *tx, user).await?;
        insert_link(&mut *tx, link).await?;
        tx.commit().await?;

        debug!(user_id = %user.id, link_id = %link.id, "Created user with first login method");
        Ok(())
    }

    async fn create_user_auth(&self, link: &UserAuth) -> StoreResult<()> {
        insert_link(&self.db, link).await
    }

    async fn auth_by_external_id(
        &self,
        provider_id: &str,
        external_id: &str,
    ) -> StoreResult<Option<UserAuth>> {
        self.fetch_link(
            "auth_provider_id = ? AND provider_user_id = ?",
            &[provider_id, external_id],
        )
        .await
    }

    async fn auth_by_username(
        &self,
        provider_id: &str,
        username: &str,
    ) -> StoreResult<Option<UserAuth>> {
        self.fetch_link("auth_provider_id = ? AND username = ?", &[provider_id, username])
            .await
    }

    async fn auth_by_user(
        &self,
        user_id: &str,
        provider_id: &str,
    ) -> StoreResult<Option<UserAuth>> {
        self.fetch_link(
            "user_id = ? AND auth_provider_id = ? ORDER BY created_at LIMIT 1",
            &[user_id, provider_id],
        )
        .await
    }

    async fn auths_for_user(&self, user_id: &str) -> StoreResult<Vec<UserAuth>> {
        let sql = format!(
            "SELECT {} FROM user_auth WHERE user_id = ? ORDER BY created_at",
            USER_AUTH_COLUMNS
        );
        let rows = sqlx::query_as::<_, UserAuthRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(UserAuth::from).collect())
    }

    async fn update_user_auth(&self, link: &UserAuth) -> StoreResult<UserAuth> {
        let provider_data = link.provider_data.to_column()?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE user_auth SET provider_user_id = ?, provider_email = ?, username = ?,
                provider_data = ?, is_verified = ?, verified_at = ?, otp_code = ?,
                otp_expires_at = ?, otp_attempts = ?, version = version + 1, updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(&link.provider_user_id)
        .bind(&link.provider_email)
        .bind(&link.username)
        .bind(provider_data)
        .bind(link.is_verified)
        .bind(link.verified_at)
        .bind(&link.otp_code)
        .bind(link.otp_expires_at)
        .bind(link.otp_attempts)
        .bind(now)
        .bind(&link.id)
        .bind(link.version)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM user_auth WHERE id = ?")
                .bind(&link.id)
                .fetch_optional(&self.db)
                .await?;
            return Err(match exists {
                Some(_) => StoreError::StaleWrite,
                None => StoreError::NotFound,
            });
        }

        let mut stored = link.clone();
        stored.version += 1;
        stored.updated_at = now;
        Ok(stored)
    }
}

#[async_trait]
impl ProviderCatalog for SqliteIdentityStore {
    async fn all_providers(&self) -> StoreResult<Vec<AuthProvider>> {
        let providers =
            sqlx::query_as::<_, AuthProvider>("SELECT * FROM auth_providers ORDER BY created_at, name")
                .fetch_all(&self.db)
                .await?;
        Ok(providers)
    }

    async fn provider_by_name(&self, name: &str) -> StoreResult<Option<AuthProvider>> {
        let provider = sqlx::query_as::<_, AuthProvider>("SELECT * FROM auth_providers WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.db)
            .await?;
        Ok(provider)
    }

    async fn insert_providers(&self, providers: &[AuthProvider]) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        for provider in providers {
            sqlx::query(
                "INSERT INTO auth_providers (id, name, display_name, description, is_active, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&provider.id)
            .bind(&provider.name)
            .bind(&provider.display_name)
            .bind(&provider.description)
            .bind(provider.is_active)
            .bind(provider.created_at)
            .bind(provider.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

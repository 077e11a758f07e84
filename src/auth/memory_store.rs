//! In-memory store used by the flow tests

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

use super::models::{AuthProvider, User, UserAuth};
use super::store::{
    Constraint, IdentityStore, ProviderCatalog, StoreError, StoreResult,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    links: Vec<UserAuth>,
    providers: Vec<AuthProvider>,
}

impl Tables {
    fn check_user(&self, user: &User) -> StoreResult<()> {
        if self.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(Constraint::Email));
        }
        Ok(())
    }

    fn check_link(&self, link: &UserAuth) -> StoreResult<()> {
        for existing in self.links.iter().filter(|l| l.id != link.id) {
            if existing.auth_provider_id != link.auth_provider_id {
                continue;
            }
            if link.provider_user_id.is_some() && existing.provider_user_id == link.provider_user_id {
                return Err(StoreError::Duplicate(Constraint::ProviderSubject));
            }
            if link.username.is_some() && existing.username == link.username {
                return Err(StoreError::Duplicate(Constraint::ProviderUsername));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryIdentityStore {
    tables: Mutex<Tables>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().unwrap().users.len()
    }

    pub fn link_count(&self) -> usize {
        self.tables.lock().unwrap().links.len()
    }

    pub fn set_provider_active(&self, name: &str, active: bool) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(p) = tables.providers.iter_mut().find(|p| p.name == name) {
            p.is_active = active;
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let slot = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(StoreError::NotFound)?;
        *slot = user.clone();
        Ok(())
    }

    async fn create_user_with_auth(&self, user: &User, link: &UserAuth) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.check_user(user)?;
        tables.check_link(link)?;
        tables.users.push(user.clone());
        tables.links.push(link.clone());
        Ok(())
    }

    async fn create_user_auth(&self, link: &UserAuth) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.check_link(link)?;
        tables.links.push(link.clone());
        Ok(())
    }

    async fn auth_by_external_id(
        &self,
        provider_id: &str,
        external_id: &str,
    ) -> StoreResult<Option<UserAuth>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .links
            .iter()
            .find(|l| {
                l.auth_provider_id == provider_id
                    && l.provider_user_id.as_deref() == Some(external_id)
            })
            .cloned())
    }

    async fn auth_by_username(
        &self,
        provider_id: &str,
        username: &str,
    ) -> StoreResult<Option<UserAuth>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .links
            .iter()
            .find(|l| l.auth_provider_id == provider_id && l.username.as_deref() == Some(username))
            .cloned())
    }

    async fn auth_by_user(
        &self,
        user_id: &str,
        provider_id: &str,
    ) -> StoreResult<Option<UserAuth>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .links
            .iter()
            .find(|l| l.user_id == user_id && l.auth_provider_id == provider_id)
            .cloned())
    }

    async fn auths_for_user(&self, user_id: &str) -> StoreResult<Vec<UserAuth>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .links
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_user_auth(&self, link: &UserAuth) -> StoreResult<UserAuth> {
        let mut tables = self.tables.lock().unwrap();
        tables.check_link(link)?;
        let slot = tables
            .links
            .iter_mut()
            .find(|l| l.id == link.id)
            .ok_or(StoreError::NotFound)?;
        if slot.version != link.version {
            return Err(StoreError::StaleWrite);
        }
        let mut stored = link.clone();
        stored.version += 1;
        stored.updated_at = Utc::now();
        *slot = stored.clone();
        Ok(stored)
    }
}

#[async_trait]
impl ProviderCatalog for MemoryIdentityStore {
    async fn all_providers(&self) -> StoreResult<Vec<AuthProvider>> {
        Ok(self.tables.lock().unwrap().providers.clone())
    }

    async fn provider_by_name(&self, name: &str) -> StoreResult<Option<AuthProvider>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.providers.iter().find(|p| p.name == name).cloned())
    }

    async fn insert_providers(&self, providers: &[AuthProvider]) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        for p in providers {
            if tables.providers.iter().any(|existing| existing.name == p.name) {
                return Err(StoreError::Duplicate(Constraint::ProviderName));
            }
        }
        tables.providers.extend_from_slice(providers);
        Ok(())
    }
}

//! Catalog of supported authentication methods

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use super::errors::AuthError;
use super::models::{AuthProvider, ProviderKind};
use super::store::ProviderCatalog;
use crate::common::generate_provider_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded(usize),
    AlreadySeeded,
}

#[derive(Clone)]
pub struct ProviderRegistry {
    catalog: Arc<dyn ProviderCatalog>,
}

impl ProviderRegistry {
    pub fn new(catalog: Arc<dyn ProviderCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn get_all(&self) -> Result<Vec<AuthProvider>, AuthError> {
        Ok(self.catalog.all_providers().await?)
    }

    /// Look up an active provider. Missing and deactivated entries both
    /// yield `ProviderNotFound`.
    pub async fn get_by_name(&self, name: &str) -> Result<AuthProvider, AuthError> {
        match self.catalog.provider_by_name(name).await? {
            Some(provider) if provider.is_active => Ok(provider),
            Some(_) => {
                error!(provider = %name, "Auth provider is deactivated");
                Err(AuthError::ProviderNotFound(name.to_string()))
            }
            None => Err(AuthError::ProviderNotFound(name.to_string())),
        }
    }

    pub async fn get(&self, kind: ProviderKind) -> Result<AuthProvider, AuthError> {
        self.get_by_name(kind.as_str()).await
    }

    /// Insert the six built-in providers, but only into an empty catalog
    pub async fn ensure_defaults(&self) -> Result<SeedOutcome, AuthError> {
        if !self.catalog.all_providers().await?.is_empty() {
            return Ok(SeedOutcome::AlreadySeeded);
        }

        let now = Utc::now();
        let defaults: Vec<AuthProvider> = ProviderKind::ALL
            .iter()
            .map(|kind| AuthProvider {
                id: generate_provider_id(),
                name: kind.as_str().to_string(),
                display_name: kind.display_name().to_string(),
                description: kind.description().to_string(),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .collect();

        self.catalog.insert_providers(&defaults).await?;
        info!(count = defaults.len(), "Seeded default auth providers");
        Ok(SeedOutcome::Seeded(defaults.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory_store::MemoryIdentityStore;

    fn registry() -> (ProviderRegistry, Arc<MemoryIdentityStore>) {
        let store = Arc::new(MemoryIdentityStore::new());
        (ProviderRegistry::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_ensure_defaults_seeds_once() {
        let (registry, _) = registry();

        assert_eq!(registry.ensure_defaults().await.unwrap(), SeedOutcome::Seeded(6));
        assert_eq!(registry.ensure_defaults().await.unwrap(), SeedOutcome::AlreadySeeded);

        let names: Vec<String> = registry
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(
            names,
            vec!["local", "google", "facebook", "apple", "mobile_otp", "email_otp"]
        );
    }

    #[tokio::test]
    async fn test_non_empty_catalog_is_left_alone() {
        let (registry, store) = registry();
        let now = Utc::now();
        store
            .insert_providers(&[AuthProvider {
                id: generate_provider_id(),
                name: "local".to_string(),
                display_name: "Custom".to_string(),
                description: String::new(),
                is_active: true,
                created_at: now,
                updated_at: now,
            }])
            .await
            .unwrap();

        assert_eq!(registry.ensure_defaults().await.unwrap(), SeedOutcome::AlreadySeeded);
        assert_eq!(registry.get_all().await.unwrap().len(), 1);
        assert!(matches!(
            registry.get(ProviderKind::Google).await,
            Err(AuthError::ProviderNotFound(name)) if name == "google"
        ));
    }

    #[tokio::test]
    async fn test_get_by_name() {
        let (registry, store) = registry();
        registry.ensure_defaults().await.unwrap();

        let google = registry.get_by_name("google").await.unwrap();
        assert_eq!(google.display_name, "Google OAuth");
        assert!(google.id.starts_with("AP_"));

        store.set_provider_active("google", false);
        assert!(matches!(
            registry.get_by_name("google").await,
            Err(AuthError::ProviderNotFound(_))
        ));
        assert!(matches!(
            registry.get_by_name("myspace").await,
            Err(AuthError::ProviderNotFound(_))
        ));
    }
}

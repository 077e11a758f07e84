//! Shared fixtures for the flow tests

use chrono::Duration;
use std::sync::Arc;

use super::linker::IdentityLinker;
use super::memory_store::MemoryIdentityStore;
use super::password::{CredentialHasher, TEST_COST};
use super::providers::ProviderRegistry;
use super::session::SessionIssuer;
use super::token::TokenManager;

pub const TEST_SECRET: &str = "test_secret_key";

pub struct Fixture {
    pub store: Arc<MemoryIdentityStore>,
    pub providers: ProviderRegistry,
    pub linker: IdentityLinker,
    pub tokens: Arc<TokenManager>,
    pub sessions: SessionIssuer,
    pub hasher: CredentialHasher,
}

pub async fn fixture() -> Fixture {
    let store = Arc::new(MemoryIdentityStore::new());
    let providers = ProviderRegistry::new(store.clone());
    providers.ensure_defaults().await.unwrap();

    let tokens = Arc::new(TokenManager::new(TEST_SECRET, Duration::minutes(15)));

    Fixture {
        linker: IdentityLinker::new(store.clone(), providers.clone()),
        sessions: SessionIssuer::new(tokens.clone()),
        hasher: CredentialHasher::with_cost(TEST_COST),
        store,
        providers,
        tokens,
    }
}

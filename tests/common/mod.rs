#![allow(dead_code)]

use chrono::Duration;
use inkwell::{
    AppConfig, AppState, InMemoryRepository, MockStorageService,
    credentials::CredentialService,
    models::{Account, Category, NewAccount, NewCategory, Role},
    repository::{Repository, RepositoryState},
    storage::StorageState,
};
use std::sync::Arc;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "correct-horse";

/// Credential service with the cheapest bcrypt cost so suites stay fast.
pub fn test_credentials() -> CredentialService {
    CredentialService::new(TEST_SECRET, Duration::hours(1), 4)
}

pub fn test_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState {
        repo: repo as RepositoryState,
        storage: Arc::new(MockStorageService::new()) as StorageState,
        config: AppConfig::default(),
        credentials: test_credentials(),
    }
}

pub async fn seed_account(
    repo: &dyn Repository,
    credentials: &CredentialService,
    username: &str,
    email: &str,
    role: Role,
) -> Account {
    let password_hash = credentials
        .hash_password(TEST_PASSWORD)
        .await
        .expect("hash test password");
    repo.create_account(NewAccount {
        username: username.to_string(),
        email: email.to_string(),
        password_hash,
        age: 30,
        role,
    })
    .await
    .expect("seed account")
}

pub async fn seed_category(repo: &dyn Repository, name: &str) -> Category {
    repo.create_category(NewCategory {
        name: name.to_string(),
        image: format!("images/{name}.png"),
    })
    .await
    .expect("seed category")
}

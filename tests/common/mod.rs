// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use simple_bank::application::BankService;
use simple_bank::domain::{Account, Cents};
use simple_bank::storage::{CreateAccountParams, LedgerOps};
use simple_bank::util::RandomGen;
use simple_bank::{Store, StoreConfig};
use tempfile::TempDir;

/// Config for a fresh database file inside `dir`
pub fn test_config(dir: &TempDir) -> StoreConfig {
    let db_path = dir.path().join("test.db");
    StoreConfig::for_path(db_path.to_str().unwrap()).with_create_if_missing(true)
}

/// Helper to create a migrated store backed by a temporary database
pub async fn test_store() -> Result<(Store, TempDir)> {
    let temp_dir = TempDir::new()?;
    let store = Store::init(&test_config(&temp_dir)).await?;
    Ok((store, temp_dir))
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(BankService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = BankService::init(test_config(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Open an EUR account with the given balance
pub async fn create_account(store: &Store, owner: &str, balance: Cents) -> Result<Account> {
    let account = store
        .queries()
        .await?
        .create_account(CreateAccountParams {
            owner: owner.to_string(),
            balance,
            currency: "EUR".to_string(),
        })
        .await?;
    Ok(account)
}

/// Open an account with a random owner and balance
pub async fn create_random_account(store: &Store, random: &mut RandomGen) -> Result<Account> {
    let owner = random.owner();
    create_account(store, &owner, random.money()).await
}

pub async fn balance_of(store: &Store, id: i64) -> Result<Cents> {
    Ok(store.queries().await?.get_account(id).await?.balance)
}

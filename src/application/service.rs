use crate::config::StoreConfig;
use crate::domain::{
    Account, AccountId, Cents, Entry, IntegrityReport, Transfer, TransferId,
    build_integrity_report, is_supported_currency,
};
use crate::storage::{
    CreateAccountParams, LedgerOps, ListParams, ListTransfersParams, Store, TransferTxParams,
    TransferTxResult,
};
use crate::util::RandomGen;

use super::AppError;

/// High-level banking operations. This is the interface the CLI uses.
pub struct BankService {
    store: Store,
}

impl BankService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create (if needed) and migrate the database described by `config`.
    pub async fn init(config: StoreConfig) -> Result<Self, AppError> {
        let store = Store::init(&config.with_create_if_missing(true)).await?;
        Ok(Self::new(store))
    }

    /// Connect to an existing database.
    pub async fn connect(config: StoreConfig) -> Result<Self, AppError> {
        let store = Store::connect(&config).await?;
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ========================
    // Account operations
    // ========================

    /// Open a new account with an initial balance.
    pub async fn create_account(
        &self,
        owner: String,
        currency: String,
        balance: Cents,
    ) -> Result<Account, AppError> {
        let owner = owner.trim().to_string();
        if owner.is_empty() {
            return Err(AppError::EmptyOwner);
        }
        if !is_supported_currency(&currency) {
            return Err(AppError::UnsupportedCurrency(currency));
        }

        let account = self
            .store
            .queries()
            .await?
            .create_account(CreateAccountParams {
                owner,
                balance,
                currency,
            })
            .await?;

        tracing::debug!(account_id = account.id, "account created");
        Ok(account)
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.store
            .queries()
            .await?
            .get_account(id)
            .await
            .map_err(AppError::from_lookup)
    }

    pub async fn list_accounts(&self, page: ListParams) -> Result<Vec<Account>, AppError> {
        Ok(self.store.queries().await?.list_accounts(page).await?)
    }

    /// Delete an account. Fails while entries or transfers still reference it.
    pub async fn delete_account(&self, id: AccountId) -> Result<(), AppError> {
        self.store
            .queries()
            .await?
            .delete_account(id)
            .await
            .map_err(AppError::from_lookup)
    }

    // ========================
    // Transfer operations
    // ========================

    /// Move money between two existing accounts of the same currency.
    pub async fn transfer(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount: Cents,
    ) -> Result<TransferTxResult, AppError> {
        let from = self.get_account(from_account_id).await?;
        let to = self.get_account(to_account_id).await?;
        if from.currency != to.currency {
            return Err(AppError::CurrencyMismatch {
                from_currency: from.currency,
                to_currency: to.currency,
            });
        }

        let result = self
            .store
            .transfer_tx(TransferTxParams {
                from_account_id,
                to_account_id,
                amount,
            })
            .await?;
        Ok(result)
    }

    pub async fn get_transfer(&self, id: TransferId) -> Result<Transfer, AppError> {
        self.store
            .queries()
            .await?
            .get_transfer(id)
            .await
            .map_err(AppError::from_lookup)
    }

    /// Transfers leaving `from_account_id` or arriving at `to_account_id`.
    pub async fn list_transfers(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        page: ListParams,
    ) -> Result<Vec<Transfer>, AppError> {
        Ok(self
            .store
            .queries()
            .await?
            .list_transfers(ListTransfersParams {
                from_account_id,
                to_account_id,
                page,
            })
            .await?)
    }

    /// Entries of one account, oldest first.
    pub async fn list_entries(
        &self,
        account_id: AccountId,
        page: ListParams,
    ) -> Result<Vec<Entry>, AppError> {
        let mut queries = self.store.queries().await?;
        queries
            .get_account(account_id)
            .await
            .map_err(AppError::from_lookup)?;
        Ok(queries.list_entries(account_id, page).await?)
    }

    // ========================
    // Maintenance
    // ========================

    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let stats = self.store.queries().await?.ledger_stats().await?;
        Ok(build_integrity_report(stats))
    }

    /// Open `count` accounts with random owners, balances and currencies.
    pub async fn seed_accounts(
        &self,
        random: &mut RandomGen,
        count: usize,
    ) -> Result<Vec<Account>, AppError> {
        let mut accounts = Vec::with_capacity(count);
        for _ in 0..count {
            let account = self
                .create_account(random.owner(), random.currency().to_string(), random.money())
                .await?;
            accounts.push(account);
        }
        Ok(accounts)
    }
}

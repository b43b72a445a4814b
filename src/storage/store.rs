use std::str::FromStr;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::config::StoreConfig;
use crate::domain::{Account, AccountId, Cents, Entry, Transfer};

use super::queries::{CreateTransferParams, LedgerOps, Queries};
use super::{MIGRATION_001_INITIAL, StoreError};

/// Ledger operations bound to an open transaction.
pub type TxQueries = Queries<Transaction<'static, Sqlite>>;

/// Ledger operations on a pooled connection, each call committed on its own.
pub type PoolQueries = Queries<PoolConnection<Sqlite>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

/// Entry point for ledger storage: standalone operations through
/// [`Store::queries`] and multi-row atomic units through [`Store::exec_tx`].
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    tx_timeout: Option<Duration>,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            tx_timeout: None,
        }
    }

    /// Bound how long a unit of work may run before it is abandoned and rolled back.
    pub fn with_tx_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tx_timeout = timeout;
        self
    }

    /// Open a connection pool according to `config`.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(config.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        tracing::debug!(url = %config.database_url, "connected to ledger database");
        Ok(Self::new(pool).with_tx_timeout(config.tx_timeout))
    }

    /// Create the ledger tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Connect and migrate.
    pub async fn init(config: &StoreConfig) -> Result<Self, StoreError> {
        let store = Self::connect(config).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Ledger operations outside of any multi-statement transaction.
    pub async fn queries(&self) -> Result<PoolQueries, StoreError> {
        Ok(Queries::new(self.pool.acquire().await?))
    }

    /// Run `f` inside one database transaction.
    ///
    /// The transaction commits if `f` succeeds and rolls back otherwise. A
    /// rollback that fails too is reported as [`StoreError::Rollback`] with
    /// both causes. Dropping the returned future before it completes also
    /// rolls the transaction back.
    pub async fn exec_tx<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'q> FnOnce(&'q mut TxQueries) -> BoxFuture<'q, Result<T, StoreError>> + Send,
    {
        // Default isolation: a deferred SQLite transaction.
        let tx = self.pool.begin().await?;
        let mut queries = Queries::new(tx);

        let outcome = match self.tx_timeout {
            Some(limit) => match tokio::time::timeout(limit, f(&mut queries)).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Cancelled(limit)),
            },
            None => f(&mut queries).await,
        };

        let tx = queries.into_inner();
        match outcome {
            Ok(value) => {
                tx.commit().await?;
                tracing::debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(error = %err, rollback_error = %rollback, "rollback failed");
                    return Err(StoreError::Rollback {
                        tx: Box::new(err),
                        rollback,
                    });
                }
                tracing::debug!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }

    /// Move `amount` from one account to another.
    ///
    /// Creates the transfer record and both entries and adjusts both
    /// balances in a single transaction. Balance sufficiency and currency
    /// matching are not checked.
    #[tracing::instrument(skip(self), err)]
    pub async fn transfer_tx(&self, params: TransferTxParams) -> Result<TransferTxResult, StoreError> {
        validate_transfer(&params)?;

        let result = self
            .exec_tx(move |queries| Box::pin(async move { transfer_in_tx(queries, params).await }))
            .await?;

        tracing::info!(transfer_id = result.transfer.id, "transfer committed");
        Ok(result)
    }
}

fn validate_transfer(params: &TransferTxParams) -> Result<(), StoreError> {
    if params.amount <= 0 {
        return Err(StoreError::Validation(format!(
            "amount must be positive, got {}",
            params.amount
        )));
    }
    if params.from_account_id == params.to_account_id {
        return Err(StoreError::Validation(format!(
            "cannot transfer from account {} to itself",
            params.from_account_id
        )));
    }
    Ok(())
}

/// The body of a transfer, run against whatever ledger handle the caller
/// supplies. `Store::transfer_tx` runs it inside a transaction.
pub async fn transfer_in_tx<O>(
    ops: &mut O,
    params: TransferTxParams,
) -> Result<TransferTxResult, StoreError>
where
    O: LedgerOps + ?Sized,
{
    let transfer = ops
        .create_transfer(CreateTransferParams {
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
        })
        .await?;

    let from_entry = ops
        .create_entry(params.from_account_id, -params.amount)
        .await?;
    let to_entry = ops.create_entry(params.to_account_id, params.amount).await?;

    // Lower id first, in every transfer, so two transfers over the same pair
    // of accounts always lock them in the same order.
    let (from_account, to_account) = if params.from_account_id < params.to_account_id {
        add_money(
            ops,
            params.from_account_id,
            -params.amount,
            params.to_account_id,
            params.amount,
        )
        .await?
    } else {
        let (to_account, from_account) = add_money(
            ops,
            params.to_account_id,
            params.amount,
            params.from_account_id,
            -params.amount,
        )
        .await?;
        (from_account, to_account)
    };

    Ok(TransferTxResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}

/// Apply two balance deltas, in exactly the order given.
pub async fn add_money<O>(
    ops: &mut O,
    account_id1: AccountId,
    amount1: Cents,
    account_id2: AccountId,
    amount2: Cents,
) -> Result<(Account, Account), StoreError>
where
    O: LedgerOps + ?Sized,
{
    let account1 = ops.add_account_balance(account_id1, amount1).await?;
    let account2 = ops.add_account_balance(account_id2, amount2).await?;
    Ok((account1, account2))
}

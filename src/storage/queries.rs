use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection};

use crate::domain::{
    Account, AccountId, Cents, Entry, EntryId, LedgerStats, Transfer, TransferId,
};

use super::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountParams {
    pub owner: String,
    pub balance: Cents,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransferParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Cents,
}

/// Page selection for list operations, ordered by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

/// Transfers leaving `from_account_id` or arriving at `to_account_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTransfersParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub page: ListParams,
}

/// Single-row ledger operations. Each call is atomic on its own; grouping
/// several calls into one atomic unit is the job of `Store::exec_tx`.
#[async_trait]
pub trait LedgerOps: Send {
    async fn create_account(&mut self, params: CreateAccountParams) -> Result<Account, StoreError>;

    async fn get_account(&mut self, id: AccountId) -> Result<Account, StoreError>;

    async fn list_accounts(&mut self, page: ListParams) -> Result<Vec<Account>, StoreError>;

    /// Overwrite the balance. Administrative only: transfers use `add_account_balance`.
    async fn update_account(&mut self, id: AccountId, balance: Cents)
    -> Result<Account, StoreError>;

    /// Apply `delta` to the current balance and return the resulting row.
    async fn add_account_balance(
        &mut self,
        id: AccountId,
        delta: Cents,
    ) -> Result<Account, StoreError>;

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError>;

    async fn create_entry(&mut self, account_id: AccountId, amount: Cents)
    -> Result<Entry, StoreError>;

    async fn get_entry(&mut self, id: EntryId) -> Result<Entry, StoreError>;

    async fn list_entries(
        &mut self,
        account_id: AccountId,
        page: ListParams,
    ) -> Result<Vec<Entry>, StoreError>;

    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError>;

    async fn get_transfer(&mut self, id: TransferId) -> Result<Transfer, StoreError>;

    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError>;

    async fn ledger_stats(&mut self) -> Result<LedgerStats, StoreError>;
}

/// `LedgerOps` over any SQLite connection handle: a pooled connection for
/// standalone calls, or an open transaction inside `Store::exec_tx`.
pub struct Queries<C> {
    conn: C,
}

impl<C> Queries<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    pub fn into_inner(self) -> C {
        self.conn
    }
}

const ACCOUNT_COLUMNS: &str = "id, owner, balance, currency, created_at";
const ENTRY_COLUMNS: &str = "id, account_id, amount, created_at";
const TRANSFER_COLUMNS: &str = "id, from_account_id, to_account_id, amount, created_at";

#[async_trait]
impl<C> LedgerOps for Queries<C>
where
    C: DerefMut<Target = SqliteConnection> + Send,
{
    async fn create_account(&mut self, params: CreateAccountParams) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO accounts (owner, balance, currency, created_at) VALUES (?, ?, ?, ?) RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(&params.owner)
        .bind(params.balance)
        .bind(&params.currency)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&mut *self.conn)
        .await?;

        row_to_account(&row)
    }

    async fn get_account(&mut self, id: AccountId) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::not_found("account", id))?;

        row_to_account(&row)
    }

    async fn list_accounts(&mut self, page: ListParams) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts ORDER BY id LIMIT ? OFFSET ?",
            ACCOUNT_COLUMNS
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter().map(row_to_account).collect()
    }

    async fn update_account(
        &mut self,
        id: AccountId,
        balance: Cents,
    ) -> Result<Account, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE accounts SET balance = ? WHERE id = ? RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(balance)
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::not_found("account", id))?;

        row_to_account(&row)
    }

    async fn add_account_balance(
        &mut self,
        id: AccountId,
        delta: Cents,
    ) -> Result<Account, StoreError> {
        // SQLite promotes an overflowing integer sum to REAL; refuse the update instead.
        let row = sqlx::query(&format!(
            "UPDATE accounts SET balance = balance + ?1 \
             WHERE id = ?2 AND typeof(balance + ?1) = 'integer' RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(delta)
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        match row {
            Some(row) => row_to_account(&row),
            None => {
                let current = self.get_account(id).await?;
                Err(StoreError::Validation(format!(
                    "balance of account {} would overflow: {} + {}",
                    id, current.balance, delta
                )))
            }
        }
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("account", id));
        }
        Ok(())
    }

    async fn create_entry(
        &mut self,
        account_id: AccountId,
        amount: Cents,
    ) -> Result<Entry, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO entries (account_id, amount, created_at) VALUES (?, ?, ?) RETURNING {}",
            ENTRY_COLUMNS
        ))
        .bind(account_id)
        .bind(amount)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&mut *self.conn)
        .await?;

        row_to_entry(&row)
    }

    async fn get_entry(&mut self, id: EntryId) -> Result<Entry, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM entries WHERE id = ?", ENTRY_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| StoreError::not_found("entry", id))?;

        row_to_entry(&row)
    }

    async fn list_entries(
        &mut self,
        account_id: AccountId,
        page: ListParams,
    ) -> Result<Vec<Entry>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM entries WHERE account_id = ? ORDER BY id LIMIT ? OFFSET ?",
            ENTRY_COLUMNS
        ))
        .bind(account_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO transfers (from_account_id, to_account_id, amount, created_at) VALUES (?, ?, ?, ?) RETURNING {}",
            TRANSFER_COLUMNS
        ))
        .bind(params.from_account_id)
        .bind(params.to_account_id)
        .bind(params.amount)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&mut *self.conn)
        .await?;

        row_to_transfer(&row)
    }

    async fn get_transfer(&mut self, id: TransferId) -> Result<Transfer, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transfers WHERE id = ?",
            TRANSFER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| StoreError::not_found("transfer", id))?;

        row_to_transfer(&row)
    }

    async fn list_transfers(
        &mut self,
        params: ListTransfersParams,
    ) -> Result<Vec<Transfer>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transfers WHERE from_account_id = ? OR to_account_id = ? ORDER BY id LIMIT ? OFFSET ?",
            TRANSFER_COLUMNS
        ))
        .bind(params.from_account_id)
        .bind(params.to_account_id)
        .bind(params.page.limit)
        .bind(params.page.offset)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter().map(row_to_transfer).collect()
    }

    async fn ledger_stats(&mut self) -> Result<LedgerStats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM accounts) AS account_count,
                (SELECT COUNT(*) FROM transfers) AS transfer_count,
                (SELECT COUNT(*) FROM entries) AS entry_count,
                (SELECT COALESCE(SUM(amount), 0) FROM entries) AS entry_total,
                (SELECT COUNT(*) FROM transfers WHERE amount <= 0) AS invalid_amounts,
                (SELECT COUNT(*) FROM transfers WHERE from_account_id = to_account_id) AS self_transfers,
                (SELECT COUNT(*) FROM entries e
                    WHERE NOT EXISTS (SELECT 1 FROM accounts a WHERE a.id = e.account_id))
                + (SELECT COUNT(*) FROM transfers t
                    WHERE NOT EXISTS (SELECT 1 FROM accounts a WHERE a.id = t.from_account_id)
                       OR NOT EXISTS (SELECT 1 FROM accounts a WHERE a.id = t.to_account_id))
                    AS dangling_refs
            "#,
        )
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(LedgerStats {
            account_count: column(&row, "account_count")?,
            transfer_count: column(&row, "transfer_count")?,
            entry_count: column(&row, "entry_count")?,
            entry_total: column(&row, "entry_total")?,
            invalid_amounts: column(&row, "invalid_amounts")?,
            self_transfers: column(&row, "self_transfers")?,
            dangling_refs: column(&row, "dangling_refs")?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp '{}': {}", value, e)))
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::InvalidData(format!("column '{}': {}", name, e)))
}

fn row_to_account(row: &SqliteRow) -> Result<Account, StoreError> {
    let created_at: String = column(row, "created_at")?;
    Ok(Account {
        id: column(row, "id")?,
        owner: column(row, "owner")?,
        balance: column(row, "balance")?,
        currency: column(row, "currency")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_entry(row: &SqliteRow) -> Result<Entry, StoreError> {
    let created_at: String = column(row, "created_at")?;
    Ok(Entry {
        id: column(row, "id")?,
        account_id: column(row, "account_id")?,
        amount: column(row, "amount")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_transfer(row: &SqliteRow) -> Result<Transfer, StoreError> {
    let created_at: String = column(row, "created_at")?;
    Ok(Transfer {
        id: column(row, "id")?,
        from_account_id: column(row, "from_account_id")?,
        to_account_id: column(row, "to_account_id")?,
        amount: column(row, "amount")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

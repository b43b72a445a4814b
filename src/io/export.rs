use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::BankService;
use crate::domain::{Account, AccountId, Cents, Entry, format_cents, sum_entries};
use crate::storage::ListParams;

/// Every entry of one account, with the balance they add up to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub exported_at: DateTime<Utc>,
    pub account: Account,
    pub entries: Vec<Entry>,
    /// Sum of the listed entries (excludes the opening balance)
    pub net_movement: Cents,
}

/// Writes ledger data out as CSV or JSON.
pub struct Exporter<'a> {
    service: &'a BankService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a BankService) -> Self {
        Self { service }
    }

    /// Export all accounts to CSV format
    pub async fn export_accounts_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.all_accounts().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "owner", "currency", "balance", "created_at"])?;

        for account in &accounts {
            csv_writer.write_record([
                account.id.to_string(),
                account.owner.clone(),
                account.currency.clone(),
                format_cents(account.balance),
                account.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(accounts.len())
    }

    /// Export one account's entries to CSV, with a running total column
    pub async fn export_statement_csv<W: Write>(
        &self,
        account_id: AccountId,
        writer: W,
    ) -> Result<usize> {
        let statement = self.statement(account_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["entry_id", "created_at", "amount", "running_total"])?;

        let mut running: Cents = 0;
        for entry in &statement.entries {
            running += entry.amount;
            csv_writer.write_record([
                entry.id.to_string(),
                entry.created_at.to_rfc3339(),
                format_cents(entry.amount),
                format_cents(running),
            ])?;
        }

        csv_writer.flush()?;
        Ok(statement.entries.len())
    }

    /// Export one account's statement as pretty JSON
    pub async fn export_statement_json<W: Write>(
        &self,
        account_id: AccountId,
        mut writer: W,
    ) -> Result<usize> {
        let statement = self.statement(account_id).await?;
        serde_json::to_writer_pretty(&mut writer, &statement)?;
        writeln!(writer)?;
        Ok(statement.entries.len())
    }

    pub async fn statement(&self, account_id: AccountId) -> Result<Statement> {
        let account = self.service.get_account(account_id).await?;
        let mut entries = Vec::new();
        let mut page = ListParams::default();
        loop {
            let batch = self.service.list_entries(account_id, page).await?;
            let done = (batch.len() as i64) < page.limit;
            entries.extend(batch);
            if done {
                break;
            }
            page.offset += page.limit;
        }

        Ok(Statement {
            exported_at: Utc::now(),
            net_movement: sum_entries(&entries),
            account,
            entries,
        })
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        let mut page = ListParams::default();
        loop {
            let batch = self.service.list_accounts(page).await?;
            let done = (batch.len() as i64) < page.limit;
            accounts.extend(batch);
            if done {
                break;
            }
            page.offset += page.limit;
        }
        Ok(accounts)
    }
}
